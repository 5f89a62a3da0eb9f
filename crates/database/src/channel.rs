//! WhatsApp channel persistence.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Channel;

/// Fields written on every channel upsert.
#[derive(Debug, Clone)]
pub struct ChannelUpsert<'a> {
    /// Normalized phone digits used as the unique key.
    pub external_id: &'a str,
    pub name: &'a str,
    pub phone: &'a str,
}

/// Insert a channel or update the existing row with the same external id.
///
/// The owner column is left untouched on update so assignments made elsewhere
/// survive redelivered events.
pub async fn upsert_channel(pool: &SqlitePool, channel: &ChannelUpsert<'_>) -> Result<Channel> {
    let row = sqlx::query_as::<_, Channel>(
        r#"
        INSERT INTO channels (id, external_id, name, phone, is_active)
        VALUES (?, ?, ?, ?, 1)
        ON CONFLICT(external_id) DO UPDATE SET
            name = excluded.name,
            phone = excluded.phone,
            is_active = 1,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        RETURNING id, external_id, name, phone, is_active, owner_id, created_at, updated_at
        "#,
    )
    .bind(crate::new_id())
    .bind(channel.external_id)
    .bind(channel.name)
    .bind(channel.phone)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Get a channel by its external id.
pub async fn get_channel_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<Channel> {
    sqlx::query_as::<_, Channel>(
        r#"
        SELECT id, external_id, name, phone, is_active, owner_id, created_at, updated_at
        FROM channels
        WHERE external_id = ?
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Channel",
        id: external_id.to_string(),
    })
}

/// Assign the owning CRM user of a channel.
pub async fn set_channel_owner(pool: &SqlitePool, id: &str, owner_id: Option<&str>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE channels
        SET owner_id = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(owner_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Channel",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Count total channels.
pub async fn count_channels(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM channels")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db;

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let db = test_db().await;
        let input = ChannelUpsert {
            external_id: "5511988887777",
            name: "Sales line",
            phone: "+55 11 98888-7777",
        };

        let first = upsert_channel(db.pool(), &input).await.unwrap();
        let second = upsert_channel(
            db.pool(),
            &ChannelUpsert {
                name: "Sales line (renamed)",
                ..input.clone()
            },
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Sales line (renamed)");
        assert!(second.is_active);
        assert_eq!(count_channels(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_owner() {
        let db = test_db().await;
        let input = ChannelUpsert {
            external_id: "5511988887777",
            name: "Sales line",
            phone: "5511988887777",
        };

        let channel = upsert_channel(db.pool(), &input).await.unwrap();
        set_channel_owner(db.pool(), &channel.id, Some("user-1"))
            .await
            .unwrap();

        let again = upsert_channel(db.pool(), &input).await.unwrap();
        assert_eq!(again.owner_id.as_deref(), Some("user-1"));

        let fetched = get_channel_by_external_id(db.pool(), "5511988887777")
            .await
            .unwrap();
        assert_eq!(fetched.owner_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_get_missing_channel() {
        let db = test_db().await;
        let result = get_channel_by_external_id(db.pool(), "123").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
