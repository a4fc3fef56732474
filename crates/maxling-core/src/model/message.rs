//! Message, recipient and chat records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::User;

// ============================================================================
// Chat Types
// ============================================================================

/// Kind of conversation a message belongs to.
///
/// `Dialog` is a 1:1 conversation with the bot; `Chat` and `Channel` are
/// group-like. Business logic uses this partition to derive session keys
/// (chat-scoped for dialogs, chat+user for groups).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// 1:1 conversation between a user and the bot.
    Dialog,
    /// Multi-user group chat.
    Chat,
    /// Broadcast channel.
    Channel,
    /// Any chat type this library does not recognize.
    #[serde(other)]
    Unknown,
}

impl ChatType {
    /// True for a 1:1 conversation.
    pub fn is_dialog(self) -> bool {
        self == ChatType::Dialog
    }

    /// True for a group-like conversation (chat or channel).
    pub fn is_group_like(self) -> bool {
        matches!(self, ChatType::Chat | ChatType::Channel)
    }
}

// ============================================================================
// Message Records
// ============================================================================

/// Where a message was delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Recipient {
    /// Chat the message was posted in.
    pub chat_id: Option<i64>,
    /// Conversation kind, when the platform reports it.
    pub chat_type: Option<ChatType>,
    /// Target user for dialog messages.
    pub user_id: Option<i64>,
}

/// A single message attachment. The payload shape varies by attachment
/// kind (image, video, file, ...) and is kept as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Attachment {
    /// Attachment kind string ("image", "video", "file", ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific payload.
    pub payload: Option<Value>,
}

/// The body of a message: its id, stream sequence number, text and
/// attachments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MessageBody {
    /// Message ID.
    pub mid: String,
    /// Sequence number within the chat's message stream.
    pub seq: i64,
    /// Message text, absent for attachment-only messages.
    pub text: Option<String>,
    /// Ordered attachment list.
    pub attachments: Vec<Attachment>,
}

/// A message received from or sent to the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Message {
    /// Sender, absent for service messages.
    pub sender: Option<User>,
    /// Delivery target.
    pub recipient: Recipient,
    /// Message body.
    pub body: MessageBody,
    /// Unix time the message was created.
    pub timestamp: i64,
    /// Public link to the message, when available.
    pub url: Option<String>,
    /// Chat metadata, attached by the caller after resolving the chat;
    /// not part of the wire message.
    #[serde(skip)]
    pub chat: Option<Chat>,
}

impl Message {
    /// Message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.body.text.as_deref()
    }

    /// Message ID.
    pub fn message_id(&self) -> &str {
        &self.body.mid
    }

    /// Chat the message belongs to.
    pub fn chat_id(&self) -> Option<i64> {
        self.recipient.chat_id
    }

    /// Sender's user ID.
    pub fn user_id(&self) -> Option<i64> {
        self.sender.as_ref().map(|u| u.user_id)
    }

    /// Conversation kind, when the platform reports it.
    pub fn chat_type(&self) -> Option<ChatType> {
        self.recipient.chat_type
    }

    /// Attached chat metadata, if the caller resolved it.
    pub fn chat(&self) -> Option<&Chat> {
        self.chat.as_ref()
    }
}

/// Chat metadata as returned by the chat endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Chat {
    /// Chat ID.
    pub chat_id: i64,
    /// Conversation kind.
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    /// Chat title, absent for dialogs.
    pub title: Option<String>,
    /// Bot's membership status in the chat.
    pub status: Option<String>,
    /// Participant count, when known.
    pub participants_count: Option<i64>,
    /// Whether the chat is publicly joinable.
    pub is_public: bool,
}

impl Default for Chat {
    fn default() -> Self {
        Self {
            chat_id: 0,
            chat_type: ChatType::Chat,
            title: None,
            status: None,
            participants_count: None,
            is_public: false,
        }
    }
}
