//! The [`MaxApi`] trait and its request/response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use maxling_core::model::{BotInfo, Message, UpdateKind};

use crate::error::ApiResult;

/// Maximum text length the platform accepts for one message.
pub const MAX_TEXT_LEN: usize = 4000;

/// One page of raw updates returned by `/updates`.
///
/// Records are kept as raw JSON here; classification into typed
/// [`maxling_core::model::Update`]s happens in the dispatcher, after the
/// page is fetched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePage {
    /// Raw update records, in stream order.
    pub updates: Vec<Value>,
    /// Cursor for the next fetch; absent when the platform has nothing
    /// newer to hand out.
    pub marker: Option<i64>,
}

/// Where to deliver an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// Post into a chat.
    Chat(i64),
    /// Post into the dialog with a user.
    User(i64),
}

/// Optional parameters for [`MaxApi::send_message`].
#[derive(Debug, Clone, Serialize)]
pub struct SendOptions {
    /// Attachments to include, in the platform's raw attachment shape.
    pub attachments: Vec<Value>,
    /// Suppress link previews in the sent message.
    pub disable_link_preview: bool,
    /// Whether recipients get a notification.
    pub notify: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            attachments: Vec::new(),
            disable_link_preview: false,
            notify: true,
        }
    }
}

/// Chat action shown to the other side while the bot works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    /// "typing..." indicator.
    TypingOn,
    /// Photo upload indicator.
    SendingPhoto,
    /// Video upload indicator.
    SendingVideo,
    /// File upload indicator.
    SendingFile,
    /// Marks the chat as read.
    MarkSeen,
}

impl ChatAction {
    /// The wire string for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TypingOn => "typing_on",
            Self::SendingPhoto => "sending_photo",
            Self::SendingVideo => "sending_video",
            Self::SendingFile => "sending_file",
            Self::MarkSeen => "mark_seen",
        }
    }
}

/// The Max Bot API surface the framework depends on.
///
/// Object-safe so the dispatcher can hold an `Arc<dyn MaxApi>` and tests can
/// swap in a scripted mock.
#[async_trait]
pub trait MaxApi: Send + Sync {
    /// Fetches the bot's own identity (`GET /me`).
    async fn get_me(&self) -> ApiResult<BotInfo>;

    /// Long-polls one page of updates (`GET /updates`).
    ///
    /// `limit` must be in `1..=1000`, `timeout_secs` in `0..=90`; the call
    /// may block up to `timeout_secs` waiting for new updates. `types`
    /// restricts the kinds the platform sends, `None` means all.
    async fn get_updates(
        &self,
        marker: Option<i64>,
        limit: u32,
        timeout_secs: u32,
        types: Option<&[UpdateKind]>,
    ) -> ApiResult<UpdatePage>;

    /// Sends a text message (`POST /messages`). `text` must not exceed
    /// [`MAX_TEXT_LEN`] characters.
    async fn send_message(
        &self,
        target: SendTarget,
        text: &str,
        options: SendOptions,
    ) -> ApiResult<Message>;

    /// Edits a previously sent message (`PUT /messages`).
    async fn edit_message(&self, message_id: &str, text: &str) -> ApiResult<()>;

    /// Deletes a previously sent message (`DELETE /messages`).
    async fn delete_message(&self, message_id: &str) -> ApiResult<()>;

    /// Shows a chat action such as the typing indicator
    /// (`POST /chats/{id}/actions`).
    async fn send_action(&self, chat_id: i64, action: ChatAction) -> ApiResult<()>;

    /// Answers a button-press callback (`POST /answers`). `text` replaces
    /// the originating message; `notification` shows a one-time popup.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        notification: Option<&str>,
    ) -> ApiResult<()>;
}
