//! Application state shared across handlers.

use database::Database;
use secrecy::SecretString;

use crate::media::MediaFetcher;
use crate::phone::PhonePlan;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Attachment downloader and store.
    pub media: MediaFetcher,
    /// Shared secret expected from the provider. `None` rejects every request.
    pub webhook_secret: Option<SecretString>,
    /// Phone matching rules.
    pub phone_plan: PhonePlan,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        db: Database,
        media: MediaFetcher,
        webhook_secret: Option<SecretString>,
        phone_plan: PhonePlan,
    ) -> Self {
        Self {
            db,
            media,
            webhook_secret,
            phone_plan,
        }
    }
}
