//! Conversation persistence.
//!
//! Conversations are keyed by the provider chat id. Creation uses
//! `ON CONFLICT DO NOTHING` and updates are single conditional statements, so
//! concurrent deliveries of the same chat never duplicate rows or regress an
//! active status.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Conversation, ConversationStatus};

/// Fields for a new conversation.
#[derive(Debug, Clone)]
pub struct NewConversation<'a> {
    pub external_id: &'a str,
    pub channel_id: &'a str,
    pub person_id: &'a str,
    pub last_message_at: &'a str,
}

/// Get a conversation by provider chat id.
pub async fn get_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<Option<Conversation>> {
    let row = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, external_id, channel_id, person_id, status, last_message_at, created_at, updated_at
        FROM conversations
        WHERE external_id = ?
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert a `pending` conversation unless one with the same external id exists.
///
/// Returns `None` when another writer created it first.
pub async fn create_if_absent(
    pool: &SqlitePool,
    conversation: &NewConversation<'_>,
) -> Result<Option<Conversation>> {
    let row = sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (id, external_id, channel_id, person_id, status, last_message_at)
        VALUES (?, ?, ?, ?, 'pending', ?)
        ON CONFLICT(external_id) DO NOTHING
        RETURNING id, external_id, channel_id, person_id, status, last_message_at, created_at, updated_at
        "#,
    )
    .bind(crate::new_id())
    .bind(conversation.external_id)
    .bind(conversation.channel_id)
    .bind(conversation.person_id)
    .bind(conversation.last_message_at)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Record new traffic on a conversation.
///
/// Closed conversations (`resolved`, `archived`) move back to `pending`; any
/// other status is kept. `last_message_at` is always refreshed.
pub async fn record_activity(
    pool: &SqlitePool,
    external_id: &str,
    last_message_at: &str,
) -> Result<Conversation> {
    sqlx::query_as::<_, Conversation>(
        r#"
        UPDATE conversations
        SET status = CASE
                WHEN status IN ('resolved', 'archived') THEN 'pending'
                ELSE status
            END,
            last_message_at = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE external_id = ?
        RETURNING id, external_id, channel_id, person_id, status, last_message_at, created_at, updated_at
        "#,
    )
    .bind(last_message_at)
    .bind(external_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: external_id.to_string(),
    })
}

/// Set a conversation's status (used by agent-facing flows).
pub async fn set_status(pool: &SqlitePool, id: &str, status: ConversationStatus) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET status = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Count conversations with the given external id (0 or 1).
pub async fn count_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM conversations WHERE external_id = ?",
    )
    .bind(external_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{upsert_channel, ChannelUpsert};
    use crate::person::{create_person, NewPerson};
    use crate::test_db;

    async fn seed(db: &crate::Database) -> (String, String) {
        let channel = upsert_channel(
            db.pool(),
            &ChannelUpsert {
                external_id: "5511988887777",
                name: "Line",
                phone: "5511988887777",
            },
        )
        .await
        .unwrap();
        let person = create_person(
            db.pool(),
            &NewPerson {
                name: "Ana",
                whatsapp: Some("+5511999998888"),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (channel.id, person.id)
    }

    #[tokio::test]
    async fn test_create_if_absent_only_once() {
        let db = test_db().await;
        let (channel_id, person_id) = seed(&db).await;
        let input = NewConversation {
            external_id: "42",
            channel_id: &channel_id,
            person_id: &person_id,
            last_message_at: "2025-03-01T10:00:00Z",
        };

        let first = create_if_absent(db.pool(), &input).await.unwrap();
        assert_eq!(first.unwrap().status, ConversationStatus::Pending);

        let second = create_if_absent(db.pool(), &input).await.unwrap();
        assert!(second.is_none());
        assert_eq!(count_by_external_id(db.pool(), "42").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_activity_reopens_closed_conversations() {
        let db = test_db().await;
        let (channel_id, person_id) = seed(&db).await;
        let created = create_if_absent(
            db.pool(),
            &NewConversation {
                external_id: "42",
                channel_id: &channel_id,
                person_id: &person_id,
                last_message_at: "2025-03-01T10:00:00Z",
            },
        )
        .await
        .unwrap()
        .unwrap();

        for closed in [ConversationStatus::Resolved, ConversationStatus::Archived] {
            set_status(db.pool(), &created.id, closed).await.unwrap();
            let updated = record_activity(db.pool(), "42", "2025-03-02T10:00:00Z")
                .await
                .unwrap();
            assert_eq!(updated.status, ConversationStatus::Pending);
            assert_eq!(
                updated.last_message_at.as_deref(),
                Some("2025-03-02T10:00:00Z")
            );
        }
    }

    #[tokio::test]
    async fn test_activity_keeps_active_status() {
        let db = test_db().await;
        let (channel_id, person_id) = seed(&db).await;
        let created = create_if_absent(
            db.pool(),
            &NewConversation {
                external_id: "42",
                channel_id: &channel_id,
                person_id: &person_id,
                last_message_at: "2025-03-01T10:00:00Z",
            },
        )
        .await
        .unwrap()
        .unwrap();
        set_status(db.pool(), &created.id, ConversationStatus::InProgress)
            .await
            .unwrap();

        let updated = record_activity(db.pool(), "42", "2025-03-03T08:30:00Z")
            .await
            .unwrap();
        assert_eq!(updated.status, ConversationStatus::InProgress);
        assert_eq!(
            updated.last_message_at.as_deref(),
            Some("2025-03-03T08:30:00Z")
        );
    }

    #[tokio::test]
    async fn test_activity_on_missing_conversation() {
        let db = test_db().await;
        let result = record_activity(db.pool(), "missing", "2025-03-01T10:00:00Z").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
