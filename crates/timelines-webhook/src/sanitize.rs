//! Text and filename sanitization for provider-supplied strings.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum stored message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// Maximum length of names (channel, contact, sender), in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Maximum length of raw phone strings, in characters.
pub const MAX_PHONE_CHARS: usize = 50;

/// Maximum length of a stored attachment filename, in characters.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Tag-shaped markup only; a bare `<` in prose is kept.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z!][^>]*>").unwrap());

/// `&amp;` is decoded last so `&amp;lt;` yields `&lt;` rather than `<`.
const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&#60;", "<"),
    ("&#62;", ">"),
    ("&#x3c;", "<"),
    ("&#x3e;", ">"),
    ("&#x3C;", "<"),
    ("&#x3E;", ">"),
    ("&quot;", "\""),
    ("&#34;", "\""),
    ("&#39;", "'"),
    ("&#x27;", "'"),
    ("&apos;", "'"),
    ("&#x2F;", "/"),
    ("&#x2f;", "/"),
    ("&#47;", "/"),
    ("&nbsp;", " "),
    ("&amp;", "&"),
];

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    ENTITIES
        .iter()
        .fold(input.to_string(), |text, (entity, plain)| {
            text.replace(entity, plain)
        })
}

/// Cut `input` to at most `max_chars` characters.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}

/// Decode common HTML entities, strip tags and NUL bytes, trim and cap.
///
/// Entities are decoded before tags are stripped so encoded markup such as
/// `&lt;script&gt;` is removed as well.
pub fn sanitize_text(input: &str, max_chars: usize) -> String {
    let decoded = decode_entities(input);
    let stripped = TAG_RE.replace_all(&decoded, "");
    let cleaned = stripped.replace('\0', "");
    truncate_chars(cleaned.trim(), max_chars)
}

/// Restrict a filename to `[A-Za-z0-9._-]` and 100 characters.
///
/// Names made only of dots (or empty after cleaning) become `file` so the
/// result is always a single, non-traversing path segment.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        return "file".to_string();
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_script_tags() {
        assert_eq!(
            sanitize_text("<script>alert(1)</script>", MAX_MESSAGE_CHARS),
            "alert(1)"
        );
    }

    #[test]
    fn test_strips_encoded_tags() {
        assert_eq!(
            sanitize_text("&lt;script&gt;alert(1)&lt;/script&gt;", MAX_MESSAGE_CHARS),
            "alert(1)"
        );
        assert_eq!(
            sanitize_text("Oi &lt;b&gt;Ana&lt;/b&gt; &amp; cia", MAX_MESSAGE_CHARS),
            "Oi Ana & cia"
        );
    }

    #[test]
    fn test_double_encoded_amp_is_decoded_once() {
        assert_eq!(sanitize_text("&amp;lt;b&amp;gt;", 100), "&lt;b&gt;");
    }

    #[test]
    fn test_removes_nul_and_trims() {
        assert_eq!(sanitize_text("  Olá\0 mundo  ", 100), "Olá mundo");
    }

    #[test]
    fn test_keeps_plain_comparisons() {
        assert_eq!(sanitize_text("1 < 2 and 3 > 2", 100), "1 < 2 and 3 > 2");
        assert_eq!(sanitize_text("te amo <3 até > amanhã", 100), "te amo <3 até > amanhã");
        assert_eq!(sanitize_text("a<b>c</b><!-- x -->d", 100), "acd");
    }

    #[test]
    fn test_caps_length_by_chars() {
        let long = "é".repeat(MAX_MESSAGE_CHARS + 50);
        let out = sanitize_text(&long, MAX_MESSAGE_CHARS);
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("cotação", 4), "cota");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("apólice final.pdf"), "ap_lice_final.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename(".."), "file");
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename(&"a".repeat(300)).len(), MAX_FILENAME_CHARS);
    }
}
