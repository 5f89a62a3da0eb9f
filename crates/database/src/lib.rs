//! SQLite persistence layer for the Timelines WhatsApp inbox.
//!
//! This crate provides async database operations for WhatsApp channels, CRM
//! people, conversations, messages and the per-person history timeline using
//! SQLx with SQLite.
//!
//! Every write keyed by a provider identifier is an upsert or a conditional
//! insert, so redelivered webhook events are safe to process again.
//!
//! # Example
//!
//! ```no_run
//! use database::{channel, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:timelines.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Register a business line
//!     let line = channel::upsert_channel(
//!         db.pool(),
//!         &channel::ChannelUpsert {
//!             external_id: "5511988887777",
//!             name: "Sales",
//!             phone: "+55 11 98888-7777",
//!         },
//!     )
//!     .await?;
//!     println!("channel {}", line.id);
//!
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod conversation;
pub mod error;
pub mod history;
pub mod message;
pub mod models;
pub mod person;

pub use error::{DatabaseError, Result};
pub use models::{
    Channel, Conversation, ConversationStatus, HistoryEntry, Message, MessageType, Person,
    SenderType,
};

pub use sqlx::SqlitePool;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Generate a new internal record ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Set high enough to handle concurrent webhook deliveries.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/timelines.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect_with_pool_size("sqlite::memory:", 1).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> Database {
    let db = Database::connect_with_pool_size("sqlite::memory:", 1)
        .await
        .unwrap();
    db.migrate().await.unwrap();
    db
}
