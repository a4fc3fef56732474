//! Echo Bot Example
//!
//! A small demonstration of the maxling framework: commands, a catch-all
//! text echo, an inline-keyboard callback and graceful shutdown.
//!
//! # Usage
//!
//! ```bash
//! MAXLING_BOT__TOKEN=<token> cargo run --package echo-bot
//! ```
//!
//! Configuration can also come from `maxling.toml` in the working
//! directory; environment variables win.

use std::sync::Arc;

use anyhow::Result;
use maxling::prelude::*;
use maxling::runtime::logging;
use tracing::info;

/// `/start` and `/help` - sends the command list.
async fn help_handler(msg: Message, api: Arc<dyn MaxApi>) -> Result<()> {
    let Some(chat_id) = msg.chat_id() else {
        return Ok(());
    };
    let help_text = "Echo Bot commands:\n\
        /help - this help\n\
        /ping - pong!\n\
        anything else is echoed back";
    api.send_message(SendTarget::Chat(chat_id), help_text, SendOptions::default())
        .await?;
    Ok(())
}

/// `/ping` - responds with pong.
async fn ping_handler(msg: Message, api: Arc<dyn MaxApi>) -> Result<()> {
    if let Some(chat_id) = msg.chat_id() {
        api.send_message(SendTarget::Chat(chat_id), "pong!", SendOptions::default())
            .await?;
    }
    Ok(())
}

/// Any non-command text - echoed back verbatim.
async fn echo_handler(msg: Message, api: Arc<dyn MaxApi>) -> Result<()> {
    if let (Some(chat_id), Some(text)) = (msg.chat_id(), msg.text()) {
        info!(chat_id, text, "echoing message");
        api.send_action(chat_id, ChatAction::TypingOn).await?;
        api.send_message(SendTarget::Chat(chat_id), text, SendOptions::default())
            .await?;
    }
    Ok(())
}

/// Button presses - acknowledged with a notification.
async fn button_handler(cb: Callback, api: Arc<dyn MaxApi>) -> Result<()> {
    let pressed = cb.payload.as_deref().unwrap_or("?");
    api.answer_callback(&cb.callback_id, None, Some(&format!("pressed: {pressed}")))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::new().load()?;
    config.validate()?;
    logging::init_from_config(&config.logging);

    let api: Arc<dyn MaxApi> =
        Arc::new(MaxClient::with_api_url(&config.bot.token, &config.bot.api_url)?);

    let mut dispatcher = Dispatcher::new();
    dispatcher.on_startup(|| async {
        info!("echo bot is up");
        Ok(())
    });
    dispatcher.on_message(
        vec![boxed(Command::new(["start", "help"]))],
        help_handler,
    );
    dispatcher.on_message(vec![boxed(Command::new(["ping"]))], ping_handler);
    // Text that is not a command at all.
    dispatcher.on_message(
        vec![boxed(And::new(vec![
            boxed(Text::any()),
            boxed(Not::new(boxed(Command::any()))),
        ]))],
        echo_handler,
    );
    dispatcher.on_callback(vec![boxed(CallbackData::any())], button_handler);

    let stop = dispatcher.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            stop.stop();
        }
    });

    dispatcher
        .start_polling(api, config.to_polling_config())
        .await?;
    Ok(())
}
