//! Private object storage for attachments.
//!
//! Stores never overwrite an existing object and never hand out public URLs;
//! callers keep the returned internal path.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Errors raised by a media store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An object already exists at the path.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// The path is not a plain relative path.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage API unreachable.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API refused the upload.
    #[error("upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A private bucket that accepts new objects by relative path.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload `bytes` to `path`, failing if the object exists.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError>;
}

/// Reject absolute paths and `..`/`.` segments before touching storage.
fn validate_path(path: &str) -> Result<(), StoreError> {
    let plain = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if plain {
        Ok(())
    } else {
        Err(StoreError::InvalidPath(path.to_string()))
    }
}

/// Bucket directory on local disk.
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    bucket_dir: PathBuf,
}

impl FsMediaStore {
    /// Store objects under `root/bucket`.
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            bucket_dir: root.into().join(bucket),
        }
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StoreError> {
        validate_path(path)?;
        let target = self.bucket_dir.join(path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        file.write_all(&bytes).await?;
        file.flush().await?;

        tracing::debug!(path, bytes = bytes.len(), "Stored attachment on disk");
        Ok(())
    }
}

/// Managed storage REST API (`/storage/v1/object/{bucket}/{path}`).
#[derive(Clone)]
pub struct HttpMediaStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    bucket: String,
}

impl HttpMediaStore {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        api_key: SecretString,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.bucket,
            path
        )
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        validate_path(path)?;

        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(self.api_key.expose_secret())
            .header("apikey", self.api_key.expose_secret())
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(path, "Uploaded attachment to storage API");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT || body.contains("Duplicate") {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }

        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
