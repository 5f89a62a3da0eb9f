//! Chat message persistence.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{Message, MessageType, SenderType};

/// Fields for a new message.
///
/// The id is chosen by the caller because attachment storage paths are
/// namespaced by it before the row exists.
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub id: &'a str,
    pub external_id: &'a str,
    pub conversation_id: &'a str,
    pub sender_type: SenderType,
    pub content: &'a str,
    pub message_type: MessageType,
    pub status: &'a str,
    pub media_url: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    pub metadata: &'a serde_json::Value,
}

/// Look up a message by provider message uid.
pub async fn get_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<Option<Message>> {
    let row = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, external_id, conversation_id, sender_type, content, message_type,
               status, media_url, mime_type, metadata, created_at
        FROM messages
        WHERE external_id = ?
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert a message unless its external id is already stored.
///
/// Returns `true` if a row was written.
pub async fn insert_if_absent(pool: &SqlitePool, message: &NewMessage<'_>) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO messages (id, external_id, conversation_id, sender_type, content,
                              message_type, status, media_url, mime_type, metadata)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(external_id) DO NOTHING
        "#,
    )
    .bind(message.id)
    .bind(message.external_id)
    .bind(message.conversation_id)
    .bind(message.sender_type)
    .bind(message.content)
    .bind(message.message_type)
    .bind(message.status)
    .bind(message.media_url)
    .bind(message.mime_type)
    .bind(message.metadata.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// List messages of a conversation, oldest first.
pub async fn list_for_conversation(pool: &SqlitePool, conversation_id: &str) -> Result<Vec<Message>> {
    let rows = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, external_id, conversation_id, sender_type, content, message_type,
               status, media_url, mime_type, metadata, created_at
        FROM messages
        WHERE conversation_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count total messages.
pub async fn count_messages(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
