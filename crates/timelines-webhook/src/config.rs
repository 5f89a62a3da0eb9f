//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;
use url::Url;

use crate::phone::PhonePlan;

/// Object-store bucket that holds WhatsApp attachments.
pub const MEDIA_BUCKET: &str = "whatsapp-media";

/// Where attachments are persisted.
#[derive(Debug, Clone)]
pub enum MediaBackend {
    /// Private bucket directory on local disk.
    Filesystem { root: PathBuf },
    /// Managed storage REST API.
    Http { base_url: Url, api_key: SecretString },
}

/// Webhook server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Shared secret expected from the provider. `None` rejects every request.
    pub webhook_secret: Option<SecretString>,
    /// Country calling code rules for phone matching.
    pub phone_plan: PhonePlan,
    /// Attachment storage backend.
    pub media: MediaBackend,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `WEBHOOK_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:timelines.db?mode=rwc` |
    /// | `TIMELINES_WEBHOOK_SECRET` | Shared webhook secret | (unset: all requests rejected) |
    /// | `WHATSAPP_COUNTRY_CODE` | Country calling code | `55` |
    /// | `MEDIA_DIR` | Filesystem bucket root | `media` |
    /// | `MEDIA_STORE_URL` | Storage API base URL | (unset: filesystem) |
    /// | `MEDIA_STORE_KEY` | Storage API key | (required with `MEDIA_STORE_URL`) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("WEBHOOK_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:timelines.db?mode=rwc".to_string());

        let webhook_secret = env::var("TIMELINES_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        let country_code = env::var("WHATSAPP_COUNTRY_CODE")
            .unwrap_or_else(|_| PhonePlan::DEFAULT_COUNTRY_CODE.to_string());
        if country_code.is_empty() || !country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidCountryCode(country_code));
        }

        let media = match env::var("MEDIA_STORE_URL").ok().filter(|s| !s.is_empty()) {
            Some(raw) => {
                let base_url = Url::parse(&raw).map_err(|_| ConfigError::InvalidStoreUrl)?;
                let api_key = env::var("MEDIA_STORE_KEY")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingStoreKey)?;
                MediaBackend::Http {
                    base_url,
                    api_key: SecretString::from(api_key),
                }
            }
            None => MediaBackend::Filesystem {
                root: env::var("MEDIA_DIR")
                    .unwrap_or_else(|_| "media".to_string())
                    .into(),
            },
        };

        Ok(Self {
            addr,
            database_url,
            webhook_secret,
            phone_plan: PhonePlan::new(country_code),
            media,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid WEBHOOK_ADDR format")]
    InvalidAddr,

    #[error("WHATSAPP_COUNTRY_CODE must be digits, got {0:?}")]
    InvalidCountryCode(String),

    #[error("Invalid MEDIA_STORE_URL")]
    InvalidStoreUrl,

    #[error("MEDIA_STORE_KEY is required when MEDIA_STORE_URL is set")]
    MissingStoreKey,
}
