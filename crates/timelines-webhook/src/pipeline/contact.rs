//! Contact resolution: match the chat's phone against existing people, or
//! create a new lead owned by the channel's owner.

use std::sync::LazyLock;

use database::person::{self, NewPerson};
use database::{Channel, Person, SqlitePool};
use regex::Regex;
use tracing::{debug, info};

use crate::error::Critical;
use crate::payload::Chat;
use crate::phone::PhonePlan;
use crate::sanitize::{sanitize_text, MAX_NAME_CHARS};
use crate::timeline;

pub const LEAD_SOURCE: &str = "whatsapp";

/// Name used when neither a real name nor any phone digits are available.
const UNKNOWN_CONTACT_NAME: &str = "WhatsApp contact";

/// Names made only of phone punctuation and digits are not real names.
static PHONE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s()+\-.]+$").unwrap());

/// A resolved contact and whether this event created it.
#[derive(Debug, Clone)]
pub struct ResolvedContact {
    pub person: Person,
    pub created: bool,
}

/// Name for a new person: the chat's display name unless it is empty or just
/// a phone number, in which case the formatted number.
pub fn display_name(chat: &Chat, plan: &PhonePlan, local_digits: &str) -> String {
    let name = chat
        .full_name
        .as_deref()
        .map(|name| sanitize_text(name, MAX_NAME_CHARS))
        .unwrap_or_default();

    if !name.is_empty() && !PHONE_LIKE.is_match(&name) {
        name
    } else if local_digits.is_empty() {
        UNKNOWN_CONTACT_NAME.to_string()
    } else {
        plan.display(local_digits)
    }
}

async fn find_existing(
    pool: &SqlitePool,
    plan: &PhonePlan,
    local_digits: &str,
) -> Critical<Option<Person>> {
    if local_digits.is_empty() {
        return Ok(None);
    }

    if let Some(found) = person::find_by_phone_fragment(pool, local_digits).await? {
        return Ok(Some(found));
    }

    let prefixed = plan.with_country_code(local_digits);
    Ok(person::find_by_phone_fragment(pool, &prefixed).await?)
}

pub async fn resolve(
    pool: &SqlitePool,
    plan: &PhonePlan,
    chat: &Chat,
    channel: &Channel,
) -> Critical<ResolvedContact> {
    let local_digits = plan.search_digits(&chat.phone);

    if let Some(existing) = find_existing(pool, plan, &local_digits).await? {
        debug!(person_id = %existing.id, "Matched existing contact");
        return Ok(ResolvedContact {
            person: existing,
            created: false,
        });
    }

    let name = display_name(chat, plan, &local_digits);
    let whatsapp = (!local_digits.is_empty()).then(|| plan.storage_format(&local_digits));
    let owner = channel.owner_id.as_deref();

    let created = person::create_person(
        pool,
        &NewPerson {
            name: &name,
            phone: None,
            whatsapp: whatsapp.as_deref(),
            lead_source: Some(LEAD_SOURCE),
            owner_id: owner,
        },
    )
    .await?;

    info!(person_id = %created.id, channel_id = %channel.id, "Created contact from WhatsApp");
    let entry = timeline::person_created(pool, &created, &channel.id, owner).await;
    if let Some(entry_id) = entry.into_option() {
        debug!(entry_id, person_id = %created.id, "Timeline entry recorded");
    }

    Ok(ResolvedContact {
        person: created,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(phone: &str, name: Option<&str>) -> Chat {
        Chat {
            chat_id: 1.into(),
            phone: phone.to_string(),
            full_name: name.map(str::to_string),
            is_group: None,
        }
    }

    #[test]
    fn test_display_name() {
        let plan = PhonePlan::default();
        assert_eq!(
            display_name(&chat("5511999998888", Some("<b>Ana</b> Souza")), &plan, "11999998888"),
            "Ana Souza"
        );
        assert_eq!(
            display_name(&chat("5511999998888", Some("+55 (11) 99999-8888")), &plan, "11999998888"),
            "+55 (11) 99999-8888"
        );
        assert_eq!(
            display_name(&chat("5511999998888", None), &plan, "11999998888"),
            "+55 (11) 99999-8888"
        );
        assert_eq!(display_name(&chat("", Some("   ")), &plan, ""), "WhatsApp contact");
    }
}
