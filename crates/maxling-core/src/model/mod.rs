//! Typed model for the Max Bot API event stream.
//!
//! The wire shape is documented at <https://dev.max.ru> (subset consumed
//! here):
//!
//! ```text
//! {
//!   "update_type": "message_created",
//!   "timestamp": 1700000000,
//!   "message":  { "sender": {...}, "recipient": {...}, "body": {...} },
//!   "callback": { "callback_id": "...", "user": {...}, "payload": "..." },
//!   "user":     {...},
//!   "chat_id":  123,
//!   "payload":  "..."
//! }
//! ```
//!
//! All sub-records are optional; absent or malformed keys degrade to `None`
//! or field defaults. [`Update::from_value`] never fails.

mod callback;
mod message;
mod update;
mod user;

pub use callback::Callback;
pub use message::{Attachment, Chat, ChatType, Message, MessageBody, Recipient};
pub use update::{Update, UpdateKind};
pub use user::{BotInfo, User};
