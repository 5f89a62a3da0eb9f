//! Person lookup and creation.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Person;

/// Fields for a new person.
#[derive(Debug, Clone, Default)]
pub struct NewPerson<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub whatsapp: Option<&'a str>,
    pub lead_source: Option<&'a str>,
    pub owner_id: Option<&'a str>,
}

/// Find the oldest person whose WhatsApp or phone field contains `digits`.
///
/// This is a substring match: it tolerates stored formatting around the
/// digits but can match more than one person for short fragments.
pub async fn find_by_phone_fragment(pool: &SqlitePool, digits: &str) -> Result<Option<Person>> {
    if digits.is_empty() {
        return Ok(None);
    }

    let person = sqlx::query_as::<_, Person>(
        r#"
        SELECT id, name, phone, whatsapp, lead_source, owner_id, created_at
        FROM people
        WHERE whatsapp LIKE '%' || ? || '%'
           OR phone LIKE '%' || ? || '%'
        ORDER BY created_at, id
        LIMIT 1
        "#,
    )
    .bind(digits)
    .bind(digits)
    .fetch_optional(pool)
    .await?;

    Ok(person)
}

/// Create a new person and return the stored row.
pub async fn create_person(pool: &SqlitePool, person: &NewPerson<'_>) -> Result<Person> {
    let id = crate::new_id();

    sqlx::query_as::<_, Person>(
        r#"
        INSERT INTO people (id, name, phone, whatsapp, lead_source, owner_id)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, name, phone, whatsapp, lead_source, owner_id, created_at
        "#,
    )
    .bind(&id)
    .bind(person.name)
    .bind(person.phone)
    .bind(person.whatsapp)
    .bind(person.lead_source)
    .bind(person.owner_id)
    .fetch_one(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Person", &id))
}

/// Get a person by ID.
pub async fn get_person(pool: &SqlitePool, id: &str) -> Result<Person> {
    sqlx::query_as::<_, Person>(
        r#"
        SELECT id, name, phone, whatsapp, lead_source, owner_id, created_at
        FROM people
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Person",
        id: id.to_string(),
    })
}

/// Count total people.
pub async fn count_people(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM people")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db;

    #[tokio::test]
    async fn test_find_by_fragment_matches_whatsapp_and_phone() {
        let db = test_db().await;
        let ana = create_person(
            db.pool(),
            &NewPerson {
                name: "Ana",
                whatsapp: Some("+5511999998888"),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let bruno = create_person(
            db.pool(),
            &NewPerson {
                name: "Bruno",
                phone: Some("21977776666"),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let found = find_by_phone_fragment(db.pool(), "11999998888")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, ana.id);

        let found = find_by_phone_fragment(db.pool(), "5511999998888")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, ana.id);

        let found = find_by_phone_fragment(db.pool(), "21977776666")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, bruno.id);

        assert!(find_by_phone_fragment(db.pool(), "31900001111")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_empty_fragment_matches_nobody() {
        let db = test_db().await;
        create_person(
            db.pool(),
            &NewPerson {
                name: "Ana",
                whatsapp: Some("+5511999998888"),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(find_by_phone_fragment(db.pool(), "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_and_get_person() {
        let db = test_db().await;
        let created = create_person(
            db.pool(),
            &NewPerson {
                name: "Carla",
                whatsapp: Some("+5511912345678"),
                lead_source: Some("whatsapp"),
                owner_id: Some("user-7"),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fetched = get_person(db.pool(), &created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.lead_source.as_deref(), Some("whatsapp"));
        assert_eq!(count_people(db.pool()).await.unwrap(), 1);
    }
}
