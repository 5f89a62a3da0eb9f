//! Person history (timeline) persistence.
//!
//! Entries are append-only: there is no update or delete here.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::HistoryEntry;

/// Fields for a new history entry.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry<'a> {
    pub person_id: &'a str,
    pub event_type: &'a str,
    pub description: &'a str,
    pub metadata: &'a serde_json::Value,
    pub created_by: Option<&'a str>,
}

/// Append a history entry and return its ID.
pub async fn append_entry(pool: &SqlitePool, entry: &NewHistoryEntry<'_>) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO person_history (person_id, event_type, description, metadata, created_by)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(entry.person_id)
    .bind(entry.event_type)
    .bind(entry.description)
    .bind(entry.metadata.to_string())
    .bind(entry.created_by)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// List history entries of a person in insertion order.
pub async fn list_for_person(pool: &SqlitePool, person_id: &str) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT id, person_id, event_type, description, metadata, created_by, created_at
        FROM person_history
        WHERE person_id = ?
        ORDER BY id
        "#,
    )
    .bind(person_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
