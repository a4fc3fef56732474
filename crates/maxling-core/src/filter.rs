//! Boolean filter algebra over [`Update`]s.
//!
//! A [`Filter`] is a predicate a handler declares at registration time; the
//! dispatcher evaluates every filter of a handler and routes the update to
//! the first handler whose filters all pass.
//!
//! Leaf filters cover the common cases (text, commands, chat type, user ID,
//! callback payload); [`And`], [`Or`] and [`Not`] compose them explicitly —
//! there is deliberately no operator sugar:
//!
//! ```
//! use std::sync::Arc;
//! use maxling_core::filter::{And, Command, Filter, Not, Text};
//!
//! let f = And::new([
//!     Arc::new(Command::new(["start"])) as Arc<dyn Filter>,
//!     Arc::new(Not::new(Arc::new(Text::contains("silent")))),
//! ]);
//! ```
//!
//! Every filter evaluates to `false` when a field it needs is absent;
//! evaluation never fails.

use std::sync::Arc;

use crate::model::{ChatType, Update};

/// A boolean predicate over an [`Update`].
pub trait Filter: Send + Sync {
    /// Whether this filter accepts the update.
    fn matches(&self, update: &Update) -> bool;
}

/// Shared, clonable filter handle stored in handler registrations.
pub type BoxedFilter = Arc<dyn Filter>;

/// Wraps a filter for registration.
pub fn boxed(filter: impl Filter + 'static) -> BoxedFilter {
    Arc::new(filter)
}

impl Filter for BoxedFilter {
    fn matches(&self, update: &Update) -> bool {
        self.as_ref().matches(update)
    }
}

// ============================================================================
// Leaf Filters
// ============================================================================

enum TextMatch {
    Any,
    AnyOf(Vec<String>),
    Contains(String),
}

/// Matches message text: exact membership in a set, a substring, or any
/// text at all. No text, no match.
pub struct Text {
    mode: TextMatch,
}

impl Text {
    /// Matches any message that has text.
    pub fn any() -> Self {
        Self {
            mode: TextMatch::Any,
        }
    }

    /// Matches when the text equals any of the given strings.
    pub fn equals<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: TextMatch::AnyOf(texts.into_iter().map(Into::into).collect()),
        }
    }

    /// Matches when the text contains the given substring.
    pub fn contains(substring: impl Into<String>) -> Self {
        Self {
            mode: TextMatch::Contains(substring.into()),
        }
    }
}

impl Filter for Text {
    fn matches(&self, update: &Update) -> bool {
        let Some(text) = update.text() else {
            return false;
        };
        match &self.mode {
            TextMatch::Any => true,
            TextMatch::AnyOf(texts) => texts.iter().any(|t| t == text),
            TextMatch::Contains(sub) => text.contains(sub.as_str()),
        }
    }
}

/// Matches command messages.
///
/// A command message is text that, after trimming, starts with `/`. The
/// first token is compared against the registered command set with any
/// `@botname` suffix stripped, so `Command::new(["start"])` matches
/// `"/start@mybot arg"`. Registered names are normalized to start with `/`.
pub struct Command {
    commands: Option<Vec<String>>,
}

impl Command {
    /// Matches the given commands, with or without their leading `/`.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands = commands
            .into_iter()
            .map(|c| {
                let c = c.into();
                if c.starts_with('/') { c } else { format!("/{c}") }
            })
            .collect();
        Self {
            commands: Some(commands),
        }
    }

    /// Matches any command message.
    pub fn any() -> Self {
        Self { commands: None }
    }
}

impl Filter for Command {
    fn matches(&self, update: &Update) -> bool {
        let Some(text) = update.text() else {
            return false;
        };
        let text = text.trim();
        if !text.starts_with('/') {
            return false;
        }
        let first = text.split_whitespace().next().unwrap_or(text);
        let command = first.split('@').next().unwrap_or(first);
        match &self.commands {
            Some(commands) => commands.iter().any(|c| c == command),
            None => true,
        }
    }
}

/// Matches by the conversation kind of the message recipient.
pub struct ChatTypeIs {
    chat_types: Vec<ChatType>,
}

impl ChatTypeIs {
    /// Matches messages delivered to any of the given chat types.
    pub fn new<I>(chat_types: I) -> Self
    where
        I: IntoIterator<Item = ChatType>,
    {
        Self {
            chat_types: chat_types.into_iter().collect(),
        }
    }

    /// Shorthand for `ChatTypeIs::new([ChatType::Dialog])`.
    pub fn dialog() -> Self {
        Self::new([ChatType::Dialog])
    }
}

impl Filter for ChatTypeIs {
    fn matches(&self, update: &Update) -> bool {
        update
            .message
            .as_ref()
            .and_then(|m| m.chat_type())
            .is_some_and(|ct| self.chat_types.contains(&ct))
    }
}

/// Matches by the ID of the user behind the update.
///
/// Checked in precedence order: message sender, then callback user, then
/// the update-level user record.
pub struct FromUser {
    user_ids: Vec<i64>,
}

impl FromUser {
    /// Matches updates triggered by any of the given user IDs.
    pub fn new<I>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            user_ids: user_ids.into_iter().collect(),
        }
    }
}

impl Filter for FromUser {
    fn matches(&self, update: &Update) -> bool {
        update
            .from_user()
            .is_some_and(|u| self.user_ids.contains(&u.user_id))
    }
}

enum PayloadMatch {
    Any,
    AnyOf(Vec<String>),
    StartsWith(String),
}

/// Matches callback payloads: exact membership or a prefix. Updates without
/// a callback payload never match.
pub struct CallbackData {
    mode: PayloadMatch,
}

impl CallbackData {
    /// Matches any callback that carries a payload.
    pub fn any() -> Self {
        Self {
            mode: PayloadMatch::Any,
        }
    }

    /// Matches when the payload equals any of the given strings.
    pub fn equals<I, S>(payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: PayloadMatch::AnyOf(payloads.into_iter().map(Into::into).collect()),
        }
    }

    /// Matches when the payload starts with the given prefix.
    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self {
            mode: PayloadMatch::StartsWith(prefix.into()),
        }
    }
}

impl Filter for CallbackData {
    fn matches(&self, update: &Update) -> bool {
        let Some(payload) = update.callback.as_ref().and_then(|c| c.payload.as_deref()) else {
            return false;
        };
        match &self.mode {
            PayloadMatch::Any => true,
            PayloadMatch::AnyOf(payloads) => payloads.iter().any(|p| p == payload),
            PayloadMatch::StartsWith(prefix) => payload.starts_with(prefix.as_str()),
        }
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Conjunction: matches when every child filter matches. Empty is vacuously
/// true.
pub struct And {
    filters: Vec<BoxedFilter>,
}

impl And {
    /// Combines the given filters with logical AND.
    pub fn new<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = BoxedFilter>,
    {
        Self {
            filters: filters.into_iter().collect(),
        }
    }
}

impl Filter for And {
    fn matches(&self, update: &Update) -> bool {
        self.filters.iter().all(|f| f.matches(update))
    }
}

/// Disjunction: matches when any child filter matches. Empty is vacuously
/// false.
pub struct Or {
    filters: Vec<BoxedFilter>,
}

impl Or {
    /// Combines the given filters with logical OR.
    pub fn new<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = BoxedFilter>,
    {
        Self {
            filters: filters.into_iter().collect(),
        }
    }
}

impl Filter for Or {
    fn matches(&self, update: &Update) -> bool {
        self.filters.iter().any(|f| f.matches(update))
    }
}

/// Negation of a filter.
pub struct Not {
    inner: BoxedFilter,
}

impl Not {
    /// Inverts the given filter.
    pub fn new(inner: BoxedFilter) -> Self {
        Self { inner }
    }
}

impl Filter for Not {
    fn matches(&self, update: &Update) -> bool {
        !self.inner.matches(update)
    }
}
