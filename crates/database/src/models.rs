//! Database models.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A WhatsApp business line, keyed by its normalized phone digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Channel {
    /// Internal UUID.
    pub id: String,
    /// Normalized phone digits (e.g., "5511988887777").
    pub external_id: String,
    /// Display name of the line.
    pub name: String,
    /// Phone number as reported by the provider.
    pub phone: String,
    /// Whether the line is active.
    pub is_active: bool,
    /// CRM user that owns the line, if assigned.
    pub owner_id: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A CRM person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Person {
    /// Internal UUID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Phone number in whatever format it was entered.
    pub phone: Option<String>,
    /// WhatsApp number, stored as `+<country><digits>` when created by the inbox.
    pub whatsapp: Option<String>,
    /// Where the lead came from (e.g., "whatsapp").
    pub lead_source: Option<String>,
    /// Owning CRM user.
    pub owner_id: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

/// Lifecycle state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ConversationStatus {
    Pending,
    InProgress,
    Resolved,
    Archived,
}

impl ConversationStatus {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Pending => "pending",
            ConversationStatus::InProgress => "in_progress",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Archived => "archived",
        }
    }

    /// Whether the conversation was closed and should reopen on new traffic.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            ConversationStatus::Resolved | ConversationStatus::Archived
        )
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat thread with a person on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Internal UUID.
    pub id: String,
    /// Provider chat id, stored as a string.
    pub external_id: String,
    /// Channel the chat belongs to.
    pub channel_id: String,
    /// Person on the other side of the chat.
    pub person_id: String,
    /// Current status.
    pub status: ConversationStatus,
    /// Timestamp of the most recently processed event.
    pub last_message_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SenderType {
    Contact,
    Agent,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Contact => "contact",
            SenderType::Agent => "agent",
        }
    }
}

/// Kind of content carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Audio,
    Video,
    Document,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Audio => "audio",
            MessageType::Video => "video",
            MessageType::Document => "document",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Internal UUID.
    pub id: String,
    /// Provider message uid, unique.
    pub external_id: String,
    /// Owning conversation.
    pub conversation_id: String,
    /// Author side.
    pub sender_type: SenderType,
    /// Sanitized text content.
    pub content: String,
    /// Content kind.
    pub message_type: MessageType,
    /// Delivery status.
    pub status: String,
    /// Internal object-store path of the attachment, never a public URL.
    pub media_url: Option<String>,
    /// MIME type of the attachment.
    pub mime_type: Option<String>,
    /// JSON metadata blob.
    pub metadata: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// An append-only history entry on a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Person the entry belongs to.
    pub person_id: String,
    /// Event kind (e.g., "whatsapp_received").
    pub event_type: String,
    /// Human-readable description.
    pub description: String,
    /// JSON metadata blob.
    pub metadata: String,
    /// Author, if known.
    pub created_by: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}
