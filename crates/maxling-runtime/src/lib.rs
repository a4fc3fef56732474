//! Runtime layer of the maxling bot framework.
//!
//! Owns everything between the transport and the handler callbacks:
//!
//! - [`Dispatcher`] — ordered handler registry with first-match-wins
//!   dispatch and the long-poll loop that drives it.
//! - [`PollingConfig`] / [`StopHandle`] — poll-loop tuning and shutdown.
//! - [`config`] — figment-based configuration (`maxling.toml` + `MAXLING_*`
//!   environment variables).
//! - [`logging`] — tracing-subscriber setup.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//!
//! let api = Arc::new(MaxClient::new(&config.bot.token)?);
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.on_message(vec![Arc::new(Command::new(["start"]))], start_handler);
//!
//! dispatcher.start_polling(api, config.polling.to_polling_config()).await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod polling;

pub use config::{ConfigLoader, MaxlingConfig};
pub use dispatcher::{Dispatcher, HandlerPayload};
pub use error::{ConfigError, RuntimeError, RuntimeResult};
pub use polling::{LoopState, PollingConfig, StopHandle};
