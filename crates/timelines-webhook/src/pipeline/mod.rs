//! The processing pipeline for a handled webhook event.
//!
//! Stages run strictly in order: channel, contact, conversation, then the
//! message when the event carries one. Each stage depends on the identifiers
//! produced by the stage before it.

pub mod channel;
pub mod contact;
pub mod conversation;
pub mod message;

use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::error::Critical;
use crate::payload::WebhookEvent;
use crate::state::AppState;

pub use message::Ingested;

/// Identifiers produced by a processed event.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub channel_id: String,
    pub person_id: String,
    pub conversation_id: String,
    pub is_new_conversation: bool,
}

/// Current time as stored in activity timestamps.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub async fn process(state: &AppState, event: &WebhookEvent) -> Critical<Outcome> {
    let pool = state.db.pool();

    let channel = channel::resolve(pool, &event.whatsapp_account).await?;
    let contact = contact::resolve(pool, &state.phone_plan, &event.chat, &channel).await?;

    let chat_key = event.chat_key();
    let conversation = conversation::resolve(
        pool,
        &chat_key,
        &channel,
        &contact.person,
        &now_timestamp(),
    )
    .await?;

    let ingested = match &event.message {
        Some(inbound) => Some(
            message::ingest(
                pool,
                &state.media,
                &channel,
                &contact.person,
                &conversation.conversation,
                inbound,
            )
            .await?,
        ),
        None => None,
    };

    let (message_id, has_media) = match &ingested {
        Some(Ingested::Stored {
            message_id,
            media_path,
        }) => (Some(message_id.as_str()), media_path.is_some()),
        _ => (None, false),
    };

    info!(
        event_type = %event.event_type,
        conversation_id = %conversation.conversation.id,
        is_new_conversation = conversation.is_new,
        person_created = contact.created,
        duplicate = matches!(ingested, Some(Ingested::Duplicate)),
        message_id = ?message_id,
        has_media,
        "Webhook event processed"
    );

    Ok(Outcome {
        channel_id: channel.id,
        person_id: contact.person.id,
        conversation_id: conversation.conversation.id,
        is_new_conversation: conversation.is_new,
    })
}
