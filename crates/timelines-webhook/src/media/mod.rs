//! Attachment download and re-hosting.
//!
//! Provider download URLs are short-lived, so attachments are copied into the
//! private `whatsapp-media` bucket while the webhook is processed. Every
//! failure here degrades to "message without media".

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::Degradable;
use crate::payload::MediaDescriptor;
use crate::sanitize::sanitize_filename;

pub use store::{FsMediaStore, HttpMediaStore, MediaStore, StoreError};

/// Maximum attachment size (10 MiB).
pub const MAX_MEDIA_BYTES: u64 = 10 * 1024 * 1024;

/// User agent sent when downloading attachments.
pub const USER_AGENT: &str = "Timelines-WhatsApp-Webhook/1.0";

/// Filename used when the provider does not send one.
const DEFAULT_FILENAME: &str = "attachment";

/// MIME types expected from WhatsApp. Others are stored with a warning.
const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "audio/ogg",
    "audio/mpeg",
    "audio/mp4",
    "audio/aac",
    "audio/amr",
    "audio/wav",
    "video/mp4",
    "video/3gpp",
    "video/quicktime",
    "video/webm",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
];

/// Errors from downloading or storing an attachment.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Request to the download URL failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Download URL answered with a non-2xx status.
    #[error("download failed with status {0}")]
    Status(reqwest::StatusCode),

    /// Declared or actual size above the cap.
    #[error("attachment too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    /// Upload to the bucket failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Whether a MIME type (parameters ignored) is on the allow-list.
pub fn is_allowed_mime(mime: &str) -> bool {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_MIME_TYPES.contains(&essence.as_str())
}

/// Object path for an attachment: `{conversation_id}/{message_id}/{filename}`.
pub fn storage_path(conversation_id: &str, message_id: &str, filename: Option<&str>) -> String {
    let filename = sanitize_filename(filename.unwrap_or(DEFAULT_FILENAME));
    format!("{}/{}/{}", conversation_id, message_id, filename)
}

/// Downloads attachments and hands them to a [`MediaStore`].
#[derive(Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
    store: Arc<dyn MediaStore>,
    max_bytes: u64,
}

impl MediaFetcher {
    /// Create a fetcher with its own HTTP client.
    pub fn new(store: Arc<dyn MediaStore>) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            store,
            max_bytes: MAX_MEDIA_BYTES,
        })
    }

    /// Download an attachment and store it under the message's namespace.
    ///
    /// Returns the internal object path, or nothing if any step failed.
    pub async fn persist(
        &self,
        conversation_id: &str,
        message_id: &str,
        media: &MediaDescriptor,
    ) -> Degradable<String> {
        if !is_allowed_mime(&media.mime_type) {
            warn!(mime_type = %media.mime_type, "Attachment MIME type not in allow-list, storing anyway");
        }

        if let Some(size) = media.declared_size.filter(|size| *size > self.max_bytes) {
            return Degradable::skipped(
                "media",
                MediaError::TooLarge {
                    size,
                    max: self.max_bytes,
                },
            );
        }

        let path = storage_path(conversation_id, message_id, media.filename.as_deref());
        let result = self.fetch_and_store(&path, media).await;

        Degradable::from_result("media", result.map(|()| path))
    }

    async fn fetch_and_store(&self, path: &str, media: &MediaDescriptor) -> Result<(), MediaError> {
        let bytes = self.download(&media.url).await?;
        let size = bytes.len();
        self.store.put(path, bytes, &media.mime_type).await?;
        debug!(path, size, "Attachment stored");
        Ok(())
    }

    /// GET the attachment, enforcing the size cap before and during the read.
    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(MediaError::Status(response.status()));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                return Err(MediaError::TooLarge {
                    size: declared,
                    max: self.max_bytes,
                });
            }
        }

        let capacity = response.content_length().unwrap_or(0).min(self.max_bytes) as usize;
        let mut body = Vec::with_capacity(capacity);
        while let Some(chunk) = response.chunk().await? {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_bytes {
                return Err(MediaError::TooLarge {
                    size,
                    max: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn descriptor(url: String, mime: &str) -> MediaDescriptor {
        MediaDescriptor {
            url,
            filename: Some("Relatório Março.pdf".to_string()),
            mime_type: mime.to_string(),
            declared_size: None,
        }
    }

    #[test]
    fn test_storage_path() {
        assert_eq!(
            storage_path("c1", "m1", Some("../secret.txt")),
            "c1/m1/.._secret.txt"
        );
        assert_eq!(storage_path("c1", "m1", None), "c1/m1/attachment");
    }

    #[test]
    fn test_allow_list() {
        assert!(is_allowed_mime("image/jpeg"));
        assert!(is_allowed_mime("audio/ogg; codecs=opus"));
        assert!(is_allowed_mime("Application/PDF"));
        assert!(!is_allowed_mime("application/x-msdownload"));
    }

    #[tokio::test]
    async fn test_persist_stores_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tmp/doc"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path(), "whatsapp-media");
        let bucket = store.bucket_dir().to_path_buf();
        let fetcher = MediaFetcher::new(Arc::new(store)).unwrap();

        let media = descriptor(format!("{}/tmp/doc", server.uri()), "application/pdf");
        let stored = fetcher.persist("c1", "m1", &media).await.into_option();

        assert_eq!(stored.as_deref(), Some("c1/m1/Relat_rio_Mar_o.pdf"));
        let bytes = std::fs::read(bucket.join("c1/m1/Relat_rio_Mar_o.pdf")).unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_persist_degrades_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            MediaFetcher::new(Arc::new(FsMediaStore::new(dir.path(), "whatsapp-media"))).unwrap();

        let media = descriptor(format!("{}/expired", server.uri()), "image/png");
        assert!(fetcher.persist("c1", "m1", &media).await.into_option().is_none());
    }

    #[tokio::test]
    async fn test_persist_skips_declared_oversize_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            MediaFetcher::new(Arc::new(FsMediaStore::new(dir.path(), "whatsapp-media"))).unwrap();

        let mut media = descriptor(format!("{}/big", server.uri()), "video/mp4");
        media.declared_size = Some(MAX_MEDIA_BYTES + 1);
        assert!(fetcher.persist("c1", "m1", &media).await.into_option().is_none());
    }

    /// Serve one chunked response of `total` bytes with no Content-Length.
    async fn chunked_server(total: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let head = "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nTransfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }

            let chunk = vec![7u8; 64 * 1024];
            let mut sent = 0;
            while sent < total {
                let len = chunk.len().min(total - sent);
                let frame = format!("{:x}\r\n", len);
                // The client hangs up once the cap is crossed.
                if socket.write_all(frame.as_bytes()).await.is_err()
                    || socket.write_all(&chunk[..len]).await.is_err()
                    || socket.write_all(b"\r\n").await.is_err()
                {
                    return;
                }
                sent += len;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        format!("http://{}/stream", addr)
    }

    #[tokio::test]
    async fn test_persist_stops_undeclared_oversize_download() {
        let url = chunked_server(MAX_MEDIA_BYTES as usize + 64 * 1024).await;

        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path(), "whatsapp-media");
        let bucket = store.bucket_dir().to_path_buf();
        let fetcher = MediaFetcher::new(Arc::new(store)).unwrap();

        let media = descriptor(url, "video/mp4");
        assert!(fetcher.persist("c1", "m1", &media).await.into_option().is_none());
        assert!(!bucket.join("c1/m1/Relat_rio_Mar_o.pdf").exists());
    }

    #[tokio::test]
    async fn test_persist_degrades_when_object_exists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 4]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            MediaFetcher::new(Arc::new(FsMediaStore::new(dir.path(), "whatsapp-media"))).unwrap();
        let media = descriptor(format!("{}/a", server.uri()), "image/png");

        assert!(fetcher.persist("c1", "m1", &media).await.is_some());
        assert!(!fetcher.persist("c1", "m1", &media).await.is_some());
    }
}
