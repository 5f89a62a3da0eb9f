//! Message ingestion: deduplicate, re-host media, store, record on timeline.

use database::message::{self, NewMessage};
use database::{Channel, Conversation, Person, SqlitePool};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Critical;
use crate::media::MediaFetcher;
use crate::payload::{classify, InboundMessage, MediaDescriptor};
use crate::sanitize::{
    sanitize_text, truncate_chars, MAX_FILENAME_CHARS, MAX_MESSAGE_CHARS, MAX_NAME_CHARS,
    MAX_PHONE_CHARS,
};
use crate::timeline::{self, MessageEvent};

/// Delivery status for every message stored from the webhook.
pub const DELIVERY_STATUS: &str = "delivered";

/// What happened to the message carried by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// Already stored under this provider uid.
    Duplicate,
    Stored {
        message_id: String,
        media_path: Option<String>,
    },
}

fn metadata(message: &InboundMessage, media: Option<&MediaDescriptor>) -> Value {
    let sender = message.sender.clone().unwrap_or_default();

    json!({
        "timestamp": message.timestamp,
        "sender_phone": sender.phone.map(|phone| truncate_chars(phone.trim(), MAX_PHONE_CHARS)),
        "sender_name": sender.full_name.map(|name| sanitize_text(&name, MAX_NAME_CHARS)),
        "original_filename": media
            .and_then(|m| m.filename.as_deref())
            .map(|name| sanitize_text(name, MAX_FILENAME_CHARS)),
    })
}

pub async fn ingest(
    pool: &SqlitePool,
    fetcher: &MediaFetcher,
    channel: &Channel,
    person: &Person,
    conversation: &Conversation,
    message: &InboundMessage,
) -> Critical<Ingested> {
    if let Some(existing) = message::get_by_external_id(pool, &message.message_uid).await? {
        info!(
            message_uid = %message.message_uid,
            message_id = %existing.id,
            "Duplicate message, skipping"
        );
        return Ok(Ingested::Duplicate);
    }

    let message_id = database::new_id();
    let content = message
        .text
        .as_deref()
        .map(|text| sanitize_text(text, MAX_MESSAGE_CHARS))
        .unwrap_or_default();
    let media = message.media();
    let message_type = classify(media.as_ref());

    let media_path = match &media {
        Some(descriptor) => fetcher
            .persist(&conversation.id, &message_id, descriptor)
            .await
            .into_option(),
        None => None,
    };

    let metadata = metadata(message, media.as_ref());
    let inserted = message::insert_if_absent(
        pool,
        &NewMessage {
            id: &message_id,
            external_id: &message.message_uid,
            conversation_id: &conversation.id,
            sender_type: message.direction.sender_type(),
            content: &content,
            message_type,
            status: DELIVERY_STATUS,
            media_url: media_path.as_deref(),
            mime_type: media.as_ref().map(|m| m.mime_type.as_str()),
            metadata: &metadata,
        },
    )
    .await?;

    if !inserted {
        // Lost a race with a concurrent delivery of the same uid.
        if let Some(path) = &media_path {
            warn!(path = %path, "Stored attachment is unreferenced after duplicate delivery");
        }
        info!(message_uid = %message.message_uid, "Duplicate message, skipping");
        return Ok(Ingested::Duplicate);
    }

    info!(
        message_id = %message_id,
        conversation_id = %conversation.id,
        message_type = %message_type,
        "Stored message"
    );

    let entry = timeline::message_recorded(
        pool,
        &MessageEvent {
            person_id: &person.id,
            message_id: &message_id,
            conversation_id: &conversation.id,
            message_type,
            direction: message.direction,
            content: &content,
            has_media: media_path.is_some(),
        },
        channel.owner_id.as_deref(),
    )
    .await;
    if let Some(entry_id) = entry.into_option() {
        debug!(entry_id, message_id = %message_id, "Timeline entry recorded");
    }

    Ok(Ingested::Stored {
        message_id,
        media_path,
    })
}
