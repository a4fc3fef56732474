//! Core types for the maxling bot framework.
//!
//! This crate contains the two leaf components everything else builds on:
//!
//! - [`model`] — the typed update model for the Max Bot API event stream.
//!   A raw JSON record is classified into an [`Update`] with a closed
//!   [`UpdateKind`] enumeration (plus an `Other(String)` escape case) and
//!   optional sub-records ([`Message`], [`Callback`], [`User`], ...).
//! - [`filter`] — composable boolean predicates over an [`Update`]:
//!   leaf filters such as [`filter::Command`] and [`filter::Text`], and the
//!   [`filter::And`] / [`filter::Or`] / [`filter::Not`] combinators.
//!
//! Dispatching and polling live in `maxling-runtime`; the HTTP client lives
//! in `maxling-api`. Neither is needed to construct or test filters.

pub mod filter;
pub mod model;

pub use filter::{And, BoxedFilter, Filter, Not, Or, boxed};
pub use model::{
    Attachment, BotInfo, Callback, Chat, ChatType, Message, MessageBody, Recipient, Update,
    UpdateKind, User,
};
