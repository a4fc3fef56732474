//! # Maxling
//!
//! A long-polling bot framework for the Max messenger platform.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  long poll  ┌────────────┐  first match  ┌──────────────┐
//! │ MaxClient │────────────▶│ Dispatcher │──────────────▶│ handler      │──▶ replies
//! │ (reqwest) │  /updates   │ (ordered   │   (kinds +    │ (async fn)   │    via MaxApi
//! └───────────┘             │  registry) │    filters)   └──────────────┘
//! ```
//!
//! - **maxling-core**: update model and the filter algebra
//! - **maxling-api**: the [`MaxApi`](maxling_api::MaxApi) trait and its
//!   `reqwest` implementation
//! - **maxling-runtime**: dispatcher, poll loop, configuration and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use maxling::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     config.validate()?;
//!     maxling::runtime::logging::init_from_config(&config.logging);
//!
//!     let api: Arc<dyn MaxApi> = Arc::new(MaxClient::new(&config.bot.token)?);
//!     let mut dispatcher = Dispatcher::new();
//!     dispatcher.on_message(vec![Arc::new(Command::new(["start"]))], |msg, api| async move {
//!         if let Some(chat_id) = msg.chat_id() {
//!             api.send_message(SendTarget::Chat(chat_id), "hi!", SendOptions::default())
//!                 .await?;
//!         }
//!         Ok(())
//!     });
//!
//!     dispatcher
//!         .start_polling(api, config.to_polling_config())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub use maxling_api as api;
pub use maxling_core as core;
pub use maxling_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use maxling::prelude::*;
/// ```
pub mod prelude {
    // Transport - trait, client and the send-side vocabulary
    pub use maxling_api::{ChatAction, MaxApi, MaxClient, SendOptions, SendTarget};

    // Update model
    pub use maxling_core::model::{
        Callback, Chat, ChatType, Message, Update, UpdateKind, User,
    };

    // Filter algebra
    pub use maxling_core::filter::{
        And, CallbackData, ChatTypeIs, Command, Filter, FromUser, Not, Or, Text, boxed,
    };

    // Runtime - dispatcher, poll loop, configuration
    pub use maxling_runtime::{
        ConfigLoader, Dispatcher, HandlerPayload, LoopState, MaxlingConfig, PollingConfig,
        RuntimeError, StopHandle,
    };
}
