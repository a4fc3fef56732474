//! Update classification.
//!
//! [`Update::from_value`] turns one raw record from the `/updates` page into
//! a typed [`Update`]. Classification is total: unrecognized `update_type`
//! strings become [`UpdateKind::Other`], missing or malformed sub-records
//! degrade to `None`, and nothing here ever panics on platform input.

use serde_json::Value;

use super::callback::Callback;
use super::message::Message;
use super::user::User;

// ============================================================================
// Update Kind
// ============================================================================

/// Closed enumeration of update kinds the Max platform emits, with an
/// explicit escape case for kinds this library does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// A new message was posted.
    MessageCreated,
    /// An existing message was edited.
    MessageEdited,
    /// A message was removed.
    MessageRemoved,
    /// An inline keyboard button was pressed.
    MessageCallback,
    /// A user pressed "start" in a dialog with the bot.
    BotStarted,
    /// A user blocked the bot.
    BotStopped,
    /// The bot was added to a chat.
    BotAdded,
    /// The bot was removed from a chat.
    BotRemoved,
    /// A user joined a chat.
    UserAdded,
    /// A user left a chat.
    UserRemoved,
    /// A chat was renamed.
    ChatTitleChanged,
    /// A chat was created from a message button.
    MessageChatCreated,
    /// Any `update_type` string not listed above, preserved verbatim.
    Other(String),
}

impl UpdateKind {
    /// Parses an `update_type` string. Never fails: unknown strings map to
    /// [`UpdateKind::Other`].
    pub fn parse(s: &str) -> Self {
        match s {
            "message_created" => Self::MessageCreated,
            "message_edited" => Self::MessageEdited,
            "message_removed" => Self::MessageRemoved,
            "message_callback" => Self::MessageCallback,
            "bot_started" => Self::BotStarted,
            "bot_stopped" => Self::BotStopped,
            "bot_added" => Self::BotAdded,
            "bot_removed" => Self::BotRemoved,
            "user_added" => Self::UserAdded,
            "user_removed" => Self::UserRemoved,
            "chat_title_changed" => Self::ChatTitleChanged,
            "message_chat_created" => Self::MessageChatCreated,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire string for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::MessageCreated => "message_created",
            Self::MessageEdited => "message_edited",
            Self::MessageRemoved => "message_removed",
            Self::MessageCallback => "message_callback",
            Self::BotStarted => "bot_started",
            Self::BotStopped => "bot_stopped",
            Self::BotAdded => "bot_added",
            Self::BotRemoved => "bot_removed",
            Self::UserAdded => "user_added",
            Self::UserRemoved => "user_removed",
            Self::ChatTitleChanged => "chat_title_changed",
            Self::MessageChatCreated => "message_chat_created",
            Self::Other(s) => s,
        }
    }

    /// True for kinds whose handlers receive the [`Message`] payload.
    pub fn is_message(&self) -> bool {
        matches!(self, Self::MessageCreated | Self::MessageEdited)
    }

    /// True for the callback kind, whose handlers receive the [`Callback`]
    /// payload.
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::MessageCallback)
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Update
// ============================================================================

/// One classified event record from the platform's update stream.
///
/// An `Update` is constructed per received raw record, handed to at most one
/// handler, and discarded. The raw payload is retained so handlers can reach
/// fields the typed model does not carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Classified kind.
    pub kind: UpdateKind,
    /// Unix time the update was emitted.
    pub timestamp: i64,
    /// The raw record as received.
    pub raw: Value,
    /// Message sub-record, for message-carrying kinds.
    pub message: Option<Message>,
    /// Callback sub-record, for `message_callback` updates.
    pub callback: Option<Callback>,
    /// User sub-record, for membership and bot lifecycle kinds.
    pub user: Option<User>,
    /// Chat ID, for chat-scoped kinds without a message.
    pub chat_id: Option<i64>,
    /// Start payload, for `bot_started` deep links.
    pub payload: Option<String>,
    /// Locale of the triggering user, when the platform reports it.
    pub user_locale: Option<String>,
}

fn decode_field<T: serde::de::DeserializeOwned>(raw: &Value, key: &str) -> Option<T> {
    let field = raw.get(key)?;
    // `null` and `{}` both mean "not present"; an empty object must not
    // materialize a defaulted sub-record.
    if field.is_null() || field.as_object().is_some_and(|o| o.is_empty()) {
        return None;
    }
    serde_json::from_value(field.clone()).ok()
}

impl Update {
    /// Classifies one raw record. Total: any JSON value yields an `Update`,
    /// with unknown kinds preserved in [`UpdateKind::Other`] and malformed
    /// sub-records dropped to `None`.
    pub fn from_value(raw: Value) -> Self {
        let kind = UpdateKind::parse(
            raw.get("update_type").and_then(Value::as_str).unwrap_or(""),
        );
        let timestamp = raw.get("timestamp").and_then(Value::as_i64).unwrap_or(0);

        let message: Option<Message> = decode_field(&raw, "message");
        let mut callback: Option<Callback> = decode_field(&raw, "callback");
        if let Some(cb) = callback.as_mut() {
            cb.message = message.clone();
        }

        Self {
            kind,
            timestamp,
            message,
            callback,
            user: decode_field(&raw, "user"),
            chat_id: raw.get("chat_id").and_then(Value::as_i64),
            payload: raw
                .get("payload")
                .and_then(Value::as_str)
                .map(str::to_string),
            user_locale: raw
                .get("user_locale")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw,
        }
    }

    /// Message text, if this update carries a message with text.
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().and_then(Message::text)
    }

    /// The user most directly responsible for this update: message sender,
    /// then callback presser, then the update-level user record.
    pub fn from_user(&self) -> Option<&User> {
        self.message
            .as_ref()
            .and_then(|m| m.sender.as_ref())
            .or_else(|| self.callback.as_ref().map(|c| &c.user))
            .or(self.user.as_ref())
    }

    /// Chat this update is scoped to, from the message recipient or the
    /// update-level `chat_id`.
    pub fn chat_id(&self) -> Option<i64> {
        self.message
            .as_ref()
            .and_then(Message::chat_id)
            .or(self.chat_id)
    }
}
