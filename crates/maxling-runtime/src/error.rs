//! Runtime error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal before the poll loop starts; nothing here is
/// retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration source failed to load or merge.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    /// No bot token was provided via file or environment.
    #[error("bot token is missing (set bot.token or MAXLING_BOT__TOKEN)")]
    MissingToken,

    /// A value is outside its accepted range.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Errors that can abort the poll loop before it enters its cycle.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The transport failed fatally (bot identity could not be fetched).
    #[error(transparent)]
    Api(#[from] maxling_api::ApiError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
