//! Person timeline entries written by the webhook.
//!
//! Every write here is best-effort: the primary rows are already committed
//! when an entry is appended, so a failure is logged and the request goes on.

use database::history::{self, NewHistoryEntry};
use database::{MessageType, Person, SqlitePool};
use serde_json::{json, Value};

use crate::error::Degradable;
use crate::payload::Direction;
use crate::sanitize::truncate_chars;

pub const PERSON_CREATED: &str = "person_created";
pub const CONVERSATION_STARTED: &str = "whatsapp_conversation_started";
pub const MESSAGE_RECEIVED: &str = "whatsapp_received";
pub const MESSAGE_SENT: &str = "whatsapp_sent";

/// Characters of message text shown in a timeline preview.
const PREVIEW_CHARS: usize = 100;

/// Append one entry; failures become a warning.
async fn append(
    pool: &SqlitePool,
    person_id: &str,
    event_type: &str,
    description: &str,
    metadata: Value,
    created_by: Option<&str>,
) -> Degradable<i64> {
    let entry = NewHistoryEntry {
        person_id,
        event_type,
        description,
        metadata: &metadata,
        created_by,
    };
    Degradable::from_result("timeline", history::append_entry(pool, &entry).await)
}

pub async fn person_created(
    pool: &SqlitePool,
    person: &Person,
    channel_id: &str,
    author: Option<&str>,
) -> Degradable<i64> {
    append(
        pool,
        &person.id,
        PERSON_CREATED,
        "Contact created automatically from an incoming WhatsApp conversation",
        json!({
            "source": "whatsapp",
            "channel_id": channel_id,
            "whatsapp": person.whatsapp,
        }),
        author,
    )
    .await
}

pub async fn conversation_started(
    pool: &SqlitePool,
    person_id: &str,
    conversation_id: &str,
    channel_id: &str,
    author: Option<&str>,
) -> Degradable<i64> {
    append(
        pool,
        person_id,
        CONVERSATION_STARTED,
        "New WhatsApp conversation started",
        json!({
            "conversation_id": conversation_id,
            "channel_id": channel_id,
        }),
        author,
    )
    .await
}

/// Details of a stored message for its timeline entry.
#[derive(Debug, Clone)]
pub struct MessageEvent<'a> {
    pub person_id: &'a str,
    pub message_id: &'a str,
    pub conversation_id: &'a str,
    pub message_type: MessageType,
    pub direction: Direction,
    pub content: &'a str,
    pub has_media: bool,
}

/// Preview text: the first 100 characters, or `[type]` when there is no text.
pub fn preview(content: &str, message_type: MessageType) -> String {
    if content.is_empty() {
        format!("[{}]", message_type)
    } else {
        truncate_chars(content, PREVIEW_CHARS)
    }
}

pub async fn message_recorded(
    pool: &SqlitePool,
    event: &MessageEvent<'_>,
    author: Option<&str>,
) -> Degradable<i64> {
    let event_type = match event.direction {
        Direction::Received => MESSAGE_RECEIVED,
        Direction::Sent => MESSAGE_SENT,
    };

    append(
        pool,
        event.person_id,
        event_type,
        &preview(event.content, event.message_type),
        json!({
            "message_id": event.message_id,
            "conversation_id": event.conversation_id,
            "message_type": event.message_type.as_str(),
            "direction": event.direction.as_str(),
            "has_media": event.has_media,
        }),
        author,
    )
    .await
}
