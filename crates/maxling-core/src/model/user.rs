//! User and bot-identity records.

use serde::{Deserialize, Serialize};

/// A Max platform user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct User {
    /// Unique user ID.
    pub user_id: i64,
    /// First name (always present on the wire, may be empty).
    pub first_name: String,
    /// Last name.
    pub last_name: Option<String>,
    /// Username without the leading `@`.
    pub username: Option<String>,
    /// Whether this user is a bot.
    pub is_bot: bool,
    /// Unix time of the user's last activity, if the platform reports it.
    pub last_activity_time: Option<i64>,
    /// Profile description.
    pub description: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
}

impl User {
    /// Display name: "first last" when a last name is present, else the
    /// first name alone.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }

    /// Mention string: "@username" when a username is present, else the
    /// first name.
    pub fn mention(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => self.first_name.clone(),
        }
    }
}

/// Bot identity as returned by the `/me` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotInfo {
    /// The bot's own user ID.
    pub user_id: i64,
    /// Display name.
    pub first_name: String,
    /// Last name.
    pub last_name: Option<String>,
    /// Username without the leading `@`.
    pub username: Option<String>,
    /// Always true for a bot identity.
    pub is_bot: bool,
    /// Bot description shown in the client.
    pub description: Option<String>,
}

impl Default for BotInfo {
    fn default() -> Self {
        Self {
            user_id: 0,
            first_name: String::new(),
            last_name: None,
            username: None,
            is_bot: true,
            description: None,
        }
    }
}
