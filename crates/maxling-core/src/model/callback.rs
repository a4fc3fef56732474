//! Button-press callback record.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::user::User;

/// A callback produced by a user pressing an inline keyboard button.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Callback {
    /// Unix time of the press.
    pub timestamp: i64,
    /// Opaque ID used to answer the callback.
    pub callback_id: String,
    /// The user who pressed the button.
    pub user: User,
    /// Payload attached to the button, if any.
    pub payload: Option<String>,
    /// The message the pressed button belongs to. Filled in from the
    /// enclosing update, not from the callback record itself.
    #[serde(skip)]
    pub message: Option<Message>,
}

impl Callback {
    /// ID of the user who pressed the button.
    pub fn user_id(&self) -> i64 {
        self.user.user_id
    }

    /// Chat the originating message was posted in, when known.
    pub fn chat_id(&self) -> Option<i64> {
        self.message.as_ref().and_then(Message::chat_id)
    }
}
