//! Inbound webhook payload: typed shape, structural validation and
//! attachment extraction.

use database::{MessageType, SenderType};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Critical, WebhookError};
use crate::phone::digits_only;

/// Event types that run the pipeline. Anything else is acknowledged and ignored.
pub const HANDLED_EVENT_TYPES: [&str; 2] = ["message:received:new", "chat:incoming:new"];

/// A webhook event as delivered by the WhatsApp provider.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event_type: String,
    pub chat: Chat,
    pub whatsapp_account: WhatsAppAccount,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

impl WebhookEvent {
    pub fn is_handled(&self) -> bool {
        HANDLED_EVENT_TYPES.contains(&self.event_type.as_str())
    }

    /// Provider chat id as stored (numbers are kept in their JSON spelling).
    pub fn chat_key(&self) -> String {
        self.chat.chat_id.to_string()
    }
}

/// The chat (the contact's side of the conversation).
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub chat_id: serde_json::Number,
    pub phone: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_group: Option<bool>,
}

/// The business line that received or sent the message.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppAccount {
    pub phone: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Message direction relative to the business line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Received,
    Sent,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Received => "received",
            Direction::Sent => "sent",
        }
    }

    pub fn sender_type(&self) -> SenderType {
        match self {
            Direction::Received => SenderType::Contact,
            Direction::Sent => SenderType::Agent,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub text: Option<String>,
    pub direction: Direction,
    /// Provider timestamp, kept verbatim in message metadata.
    #[serde(default)]
    pub timestamp: Option<Value>,
    pub message_uid: String,
    #[serde(default)]
    pub sender: Option<Sender>,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    #[serde(default)]
    pub attachments: Option<Vec<LegacyAttachment>>,
}

/// Current single-attachment shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub temporary_download_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

/// Older array-valued shape; field names varied between provider versions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyAttachment {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub temporary_download_url: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Which payload shape an attachment arrived in.
#[derive(Debug, Clone, Copy)]
pub enum AttachmentShape<'a> {
    Current(&'a Attachment),
    Legacy(&'a LegacyAttachment),
}

/// Everything the media stage needs, independent of payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub url: String,
    pub filename: Option<String>,
    pub mime_type: String,
    pub declared_size: Option<u64>,
}

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn size_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl AttachmentShape<'_> {
    /// Resolve the shape into a descriptor. Attachments without a download
    /// URL carry nothing to fetch and count as absent.
    pub fn descriptor(&self) -> Option<MediaDescriptor> {
        match self {
            AttachmentShape::Current(att) => Some(MediaDescriptor {
                url: non_empty(att.temporary_download_url.as_ref())?,
                filename: non_empty(att.filename.as_ref()),
                mime_type: non_empty(att.mimetype.as_ref())
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
                declared_size: att.size.as_ref().and_then(size_of),
            }),
            AttachmentShape::Legacy(att) => Some(MediaDescriptor {
                url: non_empty(att.temporary_download_url.as_ref())
                    .or_else(|| non_empty(att.url.as_ref()))?,
                filename: non_empty(att.filename.as_ref()),
                mime_type: non_empty(att.mime_type.as_ref())
                    .or_else(|| non_empty(att.mimetype.as_ref()))
                    .or_else(|| non_empty(att.kind.as_ref()))
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
                declared_size: None,
            }),
        }
    }
}

impl InboundMessage {
    /// The singular `attachment` wins; otherwise the first legacy entry.
    pub fn attachment_shape(&self) -> Option<AttachmentShape<'_>> {
        if let Some(att) = &self.attachment {
            return Some(AttachmentShape::Current(att));
        }
        self.attachments
            .as_deref()
            .and_then(|list| list.first())
            .map(AttachmentShape::Legacy)
    }

    pub fn media(&self) -> Option<MediaDescriptor> {
        self.attachment_shape().and_then(|shape| shape.descriptor())
    }
}

/// Classify by the MIME top-level type. No attachment means text.
pub fn classify(media: Option<&MediaDescriptor>) -> MessageType {
    let Some(media) = media else {
        return MessageType::Text;
    };

    let top_level = media
        .mime_type
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match top_level.as_str() {
        "image" => MessageType::Image,
        "audio" => MessageType::Audio,
        "video" => MessageType::Video,
        _ => MessageType::Document,
    }
}

/// Parse and structurally validate a request body.
pub fn parse_event(body: &[u8]) -> Critical<WebhookEvent> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidJson(e.to_string()))?;

    let event: WebhookEvent =
        serde_json::from_value(value).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    // The channel is keyed by these digits.
    if digits_only(&event.whatsapp_account.phone).is_empty() {
        return Err(WebhookError::InvalidPayload(
            "whatsapp_account.phone has no digits".to_string(),
        ));
    }

    Ok(event)
}
