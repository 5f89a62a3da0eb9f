//! Phone number normalization for channel keys and contact matching.

/// Strip everything but ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Country calling code rules used to match contacts stored with or without
/// the international prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonePlan {
    country_code: String,
    local_len: usize,
}

impl PhonePlan {
    pub const DEFAULT_COUNTRY_CODE: &'static str = "55";

    /// Digits in a national number including area code (e.g., "11999998888").
    pub const DEFAULT_LOCAL_LEN: usize = 11;

    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            local_len: Self::DEFAULT_LOCAL_LEN,
        }
    }

    /// Digits to search for: the country prefix is removed when the number is
    /// longer than a bare national number.
    pub fn search_digits(&self, raw: &str) -> String {
        let digits = digits_only(raw);
        match digits.strip_prefix(self.country_code.as_str()) {
            Some(local) if digits.len() > self.local_len => local.to_string(),
            _ => digits,
        }
    }

    /// The national digits with the country prefix in front.
    pub fn with_country_code(&self, local: &str) -> String {
        format!("{}{}", self.country_code, local)
    }

    /// Canonical WhatsApp storage format: `+<country><digits>`.
    pub fn storage_format(&self, local: &str) -> String {
        format!("+{}{}", self.country_code, local)
    }

    /// Human-readable number, used as a fallback contact name.
    pub fn display(&self, local: &str) -> String {
        match local.len() {
            11 => format!(
                "+{} ({}) {}-{}",
                self.country_code,
                &local[..2],
                &local[2..7],
                &local[7..]
            ),
            10 => format!(
                "+{} ({}) {}-{}",
                self.country_code,
                &local[..2],
                &local[2..6],
                &local[6..]
            ),
            _ => format!("+{} {}", self.country_code, local),
        }
    }
}

impl Default for PhonePlan {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COUNTRY_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+55 (11) 99999-8888"), "5511999998888");
        assert_eq!(digits_only("abc"), "");
    }

    #[test]
    fn test_search_digits_strips_country_code() {
        let plan = PhonePlan::default();
        assert_eq!(plan.search_digits("+55 11 99999-8888"), "11999998888");
        assert_eq!(plan.search_digits("5511999998888"), "11999998888");
        // A bare national number that happens to start with 55 is kept.
        assert_eq!(plan.search_digits("55999998888"), "55999998888");
        assert_eq!(plan.search_digits("11999998888"), "11999998888");
    }

    #[test]
    fn test_formats() {
        let plan = PhonePlan::default();
        assert_eq!(plan.with_country_code("11999998888"), "5511999998888");
        assert_eq!(plan.storage_format("11999998888"), "+5511999998888");
        assert_eq!(plan.display("11999998888"), "+55 (11) 99999-8888");
        assert_eq!(plan.display("1133334444"), "+55 (11) 3333-4444");
        assert_eq!(plan.display("123"), "+55 123");
    }

    #[test]
    fn test_custom_country_code() {
        let plan = PhonePlan::new("351");
        assert_eq!(plan.search_digits("+351 912 345 678 90"), "91234567890");
        assert_eq!(plan.storage_format("912345678"), "+351912345678");
    }
}
