//! Conversation resolution keyed by the provider's chat id.

use database::conversation::{self, NewConversation};
use database::{Channel, Conversation, Person, SqlitePool};
use tracing::{debug, info};

use crate::error::Critical;
use crate::timeline;

#[derive(Debug, Clone)]
pub struct ResolvedConversation {
    pub conversation: Conversation,
    pub is_new: bool,
}

/// Find or create the conversation for `chat_key`, refreshing its activity
/// time. A closed conversation goes back to `pending`.
pub async fn resolve(
    pool: &SqlitePool,
    chat_key: &str,
    channel: &Channel,
    person: &Person,
    now: &str,
) -> Critical<ResolvedConversation> {
    if let Some(existing) = conversation::get_by_external_id(pool, chat_key).await? {
        let updated = conversation::record_activity(pool, chat_key, now).await?;
        if existing.status.is_closed() {
            info!(
                conversation_id = %updated.id,
                previous_status = %existing.status,
                "Reopened conversation"
            );
        }
        return Ok(ResolvedConversation {
            conversation: updated,
            is_new: false,
        });
    }

    let created = conversation::create_if_absent(
        pool,
        &NewConversation {
            external_id: chat_key,
            channel_id: &channel.id,
            person_id: &person.id,
            last_message_at: now,
        },
    )
    .await?;

    match created {
        Some(created) => {
            info!(conversation_id = %created.id, chat_id = chat_key, "Started conversation");
            let entry = timeline::conversation_started(
                pool,
                &person.id,
                &created.id,
                &channel.id,
                channel.owner_id.as_deref(),
            )
            .await;
            if let Some(entry_id) = entry.into_option() {
                debug!(entry_id, conversation_id = %created.id, "Timeline entry recorded");
            }
            Ok(ResolvedConversation {
                conversation: created,
                is_new: true,
            })
        }
        None => {
            // A concurrent delivery created it between the lookup and the insert.
            debug!(chat_id = chat_key, "Conversation created concurrently");
            let updated = conversation::record_activity(pool, chat_key, now).await?;
            Ok(ResolvedConversation {
                conversation: updated,
                is_new: false,
            })
        }
    }
}
