//! Timelines WhatsApp webhook server.

use std::sync::Arc;

use database::Database;
use timelines_webhook::config::{MediaBackend, MEDIA_BUCKET};
use timelines_webhook::media::{FsMediaStore, HttpMediaStore, MediaFetcher, MediaStore};
use timelines_webhook::{app, AppState, Config};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting WhatsApp webhook server");

    if config.webhook_secret.is_none() {
        warn!("TIMELINES_WEBHOOK_SECRET is not set, every request will be rejected");
    }

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let store: Arc<dyn MediaStore> = match &config.media {
        MediaBackend::Filesystem { root } => {
            info!(root = %root.display(), bucket = MEDIA_BUCKET, "Storing media on disk");
            Arc::new(FsMediaStore::new(root.clone(), MEDIA_BUCKET))
        }
        MediaBackend::Http { base_url, api_key } => {
            info!(url = %base_url, bucket = MEDIA_BUCKET, "Storing media via storage API");
            Arc::new(HttpMediaStore::new(
                reqwest::Client::new(),
                base_url.clone(),
                api_key.clone(),
                MEDIA_BUCKET,
            ))
        }
    };
    let media = MediaFetcher::new(store)?;

    let state = AppState::new(db, media, config.webhook_secret, config.phone_plan);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "Webhook server listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
