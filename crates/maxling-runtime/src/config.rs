//! Configuration schema and figment-based loader.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. `maxling.toml` in the working directory (or a file set via
//!    [`ConfigLoader::file`])
//! 3. Environment variables (`MAXLING_*`)
//! 4. Programmatic overrides via [`ConfigLoader::merge`]
//!
//! # Environment Variable Mapping
//!
//! Variables use the `MAXLING_` prefix with `__` as section separator:
//!
//! - `MAXLING_BOT__TOKEN=xxx` → `bot.token = "xxx"`
//! - `MAXLING_POLLING__TIMEOUT_SECS=60` → `polling.timeout_secs = 60`
//! - `MAXLING_LOGGING__LEVEL=debug` → `logging.level = "debug"`

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use maxling_api::DEFAULT_API_URL;
use maxling_core::model::UpdateKind;

use crate::error::ConfigError;
use crate::polling::PollingConfig;

/// Default config file searched in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "maxling.toml";

// ============================================================================
// Schema
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MaxlingConfig {
    /// Bot credentials and endpoint.
    #[serde(default)]
    pub bot: BotConfig,

    /// Poll-loop settings.
    #[serde(default)]
    pub polling: PollingSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bot credentials and API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Access token. Required; there is no default.
    #[serde(default)]
    pub token: String,

    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Poll-loop settings, the serializable counterpart of
/// [`PollingConfig`](crate::polling::PollingConfig).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Maximum updates per page, `1..=1000`.
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Long-poll timeout in seconds, `0..=90`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,

    /// Delay after a failed fetch, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Restrict the update kinds the platform sends; empty means all.
    #[serde(default)]
    pub types: Vec<String>,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            timeout_secs: default_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            types: Vec::new(),
        }
    }
}

fn default_limit() -> u32 {
    100
}

fn default_timeout_secs() -> u32 {
    30
}

fn default_retry_delay_secs() -> u64 {
    5
}

/// Logging settings, consumed by [`crate::logging::init_from_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (compact, full, pretty).
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl MaxlingConfig {
    /// Checks the invariants the schema itself cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if !(1..=1000).contains(&self.polling.limit) {
            return Err(ConfigError::InvalidValue(format!(
                "polling.limit must be in 1..=1000, got {}",
                self.polling.limit
            )));
        }
        if self.polling.timeout_secs > 90 {
            return Err(ConfigError::InvalidValue(format!(
                "polling.timeout_secs must be at most 90, got {}",
                self.polling.timeout_secs
            )));
        }
        Ok(())
    }

    /// Converts the serializable settings into the poll loop's config.
    ///
    /// Unrecognized kind names are not an error: they parse as
    /// [`UpdateKind::Other`] and pass through to the platform verbatim.
    pub fn to_polling_config(&self) -> PollingConfig {
        let allowed_updates = if self.polling.types.is_empty() {
            None
        } else {
            Some(
                self.polling
                    .types
                    .iter()
                    .map(|t| UpdateKind::parse(t))
                    .collect(),
            )
        };
        PollingConfig {
            limit: self.polling.limit,
            timeout_secs: self.polling.timeout_secs,
            retry_delay: Duration::from_secs(self.polling.retry_delay_secs),
            allowed_updates,
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Configuration loader with figment-based multi-source support.
///
/// # Example
///
/// ```rust,ignore
/// let config = ConfigLoader::new().load()?;
/// let config = ConfigLoader::new().file("bot.toml").without_env().load()?;
/// ```
pub struct ConfigLoader {
    figment: Figment,
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader that reads `maxling.toml` and `MAXLING_*` variables.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            config_file: None,
            load_env: true,
        }
    }

    /// Sets a specific configuration file to load. The file must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically. Later merges win.
    pub fn merge(mut self, config: MaxlingConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, extracts and validates the configuration.
    pub fn load(self) -> Result<MaxlingConfig, ConfigError> {
        let Self {
            figment: overrides,
            config_file,
            load_env,
        } = self;
        let mut figment = Figment::from(Serialized::defaults(MaxlingConfig::default()));

        if let Some(path) = &config_file {
            if !path.exists() {
                return Err(ConfigError::InvalidValue(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            info!(path = %path.display(), "loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                info!(path = DEFAULT_CONFIG_FILE, "loading configuration file");
                figment = figment.merge(Toml::file(default_path));
            } else {
                warn!("no configuration file found, using defaults");
            }
        }

        if load_env {
            figment = figment.merge(Env::prefixed("MAXLING_").split("__"));
        }

        // Programmatic overrides win over every other source.
        figment = figment.merge(overrides);

        let config: MaxlingConfig = figment.extract()?;
        debug!(
            api_url = %config.bot.api_url,
            limit = config.polling.limit,
            timeout_secs = config.polling.timeout_secs,
            "configuration loaded"
        );
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete_except_the_token() {
        let config = MaxlingConfig::default();

        assert_eq!(config.bot.api_url, DEFAULT_API_URL);
        assert_eq!(config.polling.limit, 100);
        assert_eq!(config.polling.timeout_secs, 30);
        assert_eq!(config.polling.retry_delay_secs, 5);
        assert_eq!(config.logging.level, "info");
        assert!(matches!(config.validate(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn programmatic_merge_overrides_defaults() {
        let config = ConfigLoader::new()
            .without_env()
            .merge(MaxlingConfig {
                bot: BotConfig {
                    token: "t0ken".into(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .load()
            .unwrap();

        assert_eq!(config.bot.token, "t0ken");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn programmatic_merge_beats_the_environment() {
        // SAFETY: this test is the only one touching this variable and it
        // cleans up immediately after
        unsafe {
            std::env::set_var("MAXLING_BOT__TOKEN", "from-env");
        }
        let config = ConfigLoader::new()
            .merge(MaxlingConfig {
                bot: BotConfig {
                    token: "from-code".into(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .load()
            .unwrap();
        unsafe {
            std::env::remove_var("MAXLING_BOT__TOKEN");
        }

        assert_eq!(config.bot.token, "from-code");
    }

    #[test]
    fn out_of_range_polling_values_are_rejected() {
        let mut config = MaxlingConfig {
            bot: BotConfig {
                token: "t".into(),
                ..Default::default()
            },
            ..Default::default()
        };

        config.polling.limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));

        config.polling.limit = 100;
        config.polling.timeout_secs = 91;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn unknown_type_names_survive_as_other() {
        let mut config = MaxlingConfig::default();
        config.polling.types = vec!["message_created".into(), "brand_new_kind".into()];

        let polling = config.to_polling_config();
        let kinds = polling.allowed_updates.unwrap();
        assert_eq!(kinds[0], UpdateKind::MessageCreated);
        assert_eq!(kinds[1], UpdateKind::Other("brand_new_kind".into()));
    }

    #[test]
    fn empty_types_means_all_kinds() {
        let config = MaxlingConfig::default();
        let polling = config.to_polling_config();
        assert!(polling.allowed_updates.is_none());
        assert_eq!(polling.retry_delay, Duration::from_secs(5));
    }
}
