//! Handler registry and first-match-wins dispatch.
//!
//! Handlers are registered imperatively during setup, strictly before the
//! poll loop starts, so the registry needs no synchronization: the order of
//! `register`/`on_message`/`on_callback`/`on_update` calls is the order
//! updates are matched against, and the first entry whose kind set and
//! filters accept an update consumes it.
//!
//! A handler failure is logged and swallowed. It does not abort the page,
//! does not touch the cursor, and — deliberately — does not give later
//! handlers a second chance: first-match-wins is a routing decision, not a
//! fallback chain.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8};

use futures::future::BoxFuture;
use tracing::{debug, error};

use maxling_api::MaxApi;
use maxling_core::filter::BoxedFilter;
use maxling_core::model::{Callback, Message, Update, UpdateKind};

// ============================================================================
// Handler
// ============================================================================

/// What the winning handler's callback receives: the kind-appropriate view
/// of the update.
#[derive(Debug, Clone)]
pub enum HandlerPayload {
    /// For `message_created` / `message_edited` updates carrying a message.
    Message(Message),
    /// For `message_callback` updates carrying a callback.
    Callback(Callback),
    /// For every other kind, or when the expected sub-record is absent.
    Update(Update),
}

type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;
type HandlerCallback = Arc<dyn Fn(Update, Arc<dyn MaxApi>) -> HandlerFuture + Send + Sync>;
pub(crate) type LifecycleHook = Box<dyn Fn() -> HandlerFuture + Send + Sync>;

/// One registered (kind-set, filters, callback) entry. Immutable after
/// registration.
struct Handler {
    /// Kinds this handler accepts; empty means kind-agnostic.
    kinds: Vec<UpdateKind>,
    /// All filters must pass; an empty list passes everything.
    filters: Vec<BoxedFilter>,
    callback: HandlerCallback,
}

impl Handler {
    fn matches(&self, update: &Update) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&update.kind))
            && self.filters.iter().all(|f| f.matches(update))
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Ordered handler registry plus the poll-loop state that drives it
/// (see [`crate::polling`] for the loop itself).
pub struct Dispatcher {
    handlers: Vec<Handler>,
    pub(crate) startup_hook: Option<LifecycleHook>,
    pub(crate) shutdown_hook: Option<LifecycleHook>,
    /// Stream cursor; mutated exclusively by the poll loop, once per
    /// successful cycle.
    pub(crate) marker: Option<i64>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) state: Arc<AtomicU8>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates an empty dispatcher with the cursor at "start from now".
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            startup_hook: None,
            shutdown_hook: None,
            marker: None,
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a handler for the given kind set and filters.
    ///
    /// Entries are appended: earlier registrations win ties. An empty
    /// `kinds` accepts every update kind; an empty `filters` list accepts
    /// every update of the declared kinds.
    pub fn register<F, Fut>(
        &mut self,
        kinds: Vec<UpdateKind>,
        filters: Vec<BoxedFilter>,
        callback: F,
    ) where
        F: Fn(HandlerPayload, Arc<dyn MaxApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: HandlerCallback =
            Arc::new(move |update, api| Box::pin(callback(payload_for(update), api)));
        self.handlers.push(Handler {
            kinds,
            filters,
            callback,
        });
    }

    /// Registers a message handler covering `message_created` and
    /// `message_edited`; the callback receives the [`Message`].
    pub fn on_message<F, Fut>(&mut self, filters: Vec<BoxedFilter>, callback: F)
    where
        F: Fn(Message, Arc<dyn MaxApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(
            vec![UpdateKind::MessageCreated, UpdateKind::MessageEdited],
            filters,
            move |payload, api| {
                let fut = match payload {
                    HandlerPayload::Message(message) => Some(callback(message, api)),
                    _ => None,
                };
                async move {
                    match fut {
                        Some(fut) => fut.await,
                        None => Ok(()),
                    }
                }
            },
        );
    }

    /// Registers a callback handler for `message_callback`; the callback
    /// receives the [`Callback`].
    pub fn on_callback<F, Fut>(&mut self, filters: Vec<BoxedFilter>, callback: F)
    where
        F: Fn(Callback, Arc<dyn MaxApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(
            vec![UpdateKind::MessageCallback],
            filters,
            move |payload, api| {
                let fut = match payload {
                    HandlerPayload::Callback(cb) => Some(callback(cb, api)),
                    _ => None,
                };
                async move {
                    match fut {
                        Some(fut) => fut.await,
                        None => Ok(()),
                    }
                }
            },
        );
    }

    /// Registers a handler for arbitrary update kinds; the callback receives
    /// the whole [`Update`], whatever its kind. An empty `kinds` list matches
    /// every kind.
    pub fn on_update<F, Fut>(&mut self, kinds: Vec<UpdateKind>, callback: F)
    where
        F: Fn(Update, Arc<dyn MaxApi>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: HandlerCallback =
            Arc::new(move |update, api| Box::pin(callback(update, api)));
        self.handlers.push(Handler {
            kinds,
            filters: Vec::new(),
            callback,
        });
    }

    /// Sets the startup hook, run once before the first poll cycle. A hook
    /// failure is logged and does not abort startup.
    pub fn on_startup<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.startup_hook = Some(Box::new(move || Box::pin(hook())));
    }

    /// Sets the shutdown hook, run once after the loop exits. A hook failure
    /// is logged and does not block shutdown.
    pub fn on_shutdown<F, Fut>(&mut self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.shutdown_hook = Some(Box::new(move || Box::pin(hook())));
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Routes one update to the first matching handler.
    ///
    /// The winning callback gets the kind-appropriate payload; its error is
    /// logged and swallowed. Later handlers never see the update, matched or
    /// failed alike. No match at all is a silent no-op.
    pub async fn dispatch(&self, update: &Update, api: Arc<dyn MaxApi>) {
        for handler in &self.handlers {
            if !handler.matches(update) {
                continue;
            }
            if let Err(e) = (handler.callback)(update.clone(), api).await {
                error!(kind = %update.kind, error = ?e, "handler failed");
            }
            return;
        }
        debug!(kind = %update.kind, "no handler matched update");
    }
}

/// Selects the payload view a [`register`](Dispatcher::register)ed handler
/// receives for this update.
fn payload_for(mut update: Update) -> HandlerPayload {
    if update.kind.is_message()
        && let Some(message) = update.message.take()
    {
        return HandlerPayload::Message(message);
    }
    if update.kind.is_callback()
        && let Some(callback) = update.callback.take()
    {
        return HandlerPayload::Callback(callback);
    }
    HandlerPayload::Update(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use maxling_api::{ApiError, ApiResult, ChatAction, SendOptions, SendTarget, UpdatePage};
    use maxling_core::filter::{Command, Text};
    use maxling_core::model::BotInfo;

    /// An API stub for handlers that never touch the transport.
    struct NoopApi;

    #[async_trait]
    impl MaxApi for NoopApi {
        async fn get_me(&self) -> ApiResult<BotInfo> {
            Ok(BotInfo::default())
        }

        async fn get_updates(
            &self,
            _marker: Option<i64>,
            _limit: u32,
            _timeout_secs: u32,
            _types: Option<&[UpdateKind]>,
        ) -> ApiResult<UpdatePage> {
            Ok(UpdatePage::default())
        }

        async fn send_message(
            &self,
            _target: SendTarget,
            _text: &str,
            _options: SendOptions,
        ) -> ApiResult<Message> {
            Ok(Message::default())
        }

        async fn edit_message(&self, _message_id: &str, _text: &str) -> ApiResult<()> {
            Ok(())
        }

        async fn delete_message(&self, _message_id: &str) -> ApiResult<()> {
            Ok(())
        }

        async fn send_action(&self, _chat_id: i64, _action: ChatAction) -> ApiResult<()> {
            Ok(())
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            _text: Option<&str>,
            _notification: Option<&str>,
        ) -> ApiResult<()> {
            Ok(())
        }
    }

    fn api() -> Arc<dyn MaxApi> {
        Arc::new(NoopApi)
    }

    fn start_update() -> Update {
        Update::from_value(json!({
            "update_type": "message_created",
            "timestamp": 1,
            "message": {
                "sender": {"user_id": 1, "first_name": "Al"},
                "recipient": {"chat_id": 10, "chat_type": "dialog"},
                "body": {"mid": "m1", "seq": 1, "text": "/start"}
            }
        }))
    }

    #[tokio::test]
    async fn command_handler_receives_the_message() {
        let got = Arc::new(parking_lot::Mutex::new(None));
        let got2 = Arc::clone(&got);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_message(vec![Arc::new(Command::new(["start"]))], move |msg, _api| {
            let got = Arc::clone(&got2);
            async move {
                *got.lock() = Some(msg);
                Ok(())
            }
        });

        dispatcher.dispatch(&start_update(), api()).await;

        let msg = got.lock().take().expect("handler ran");
        assert_eq!(msg.text(), Some("/start"));
        assert_eq!(msg.chat_id(), Some(10));
    }

    #[tokio::test]
    async fn first_match_wins_and_later_handlers_never_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&counter);
        let c2 = Arc::clone(&counter);
        let c3 = Arc::clone(&counter);

        let mut dispatcher = Dispatcher::new();
        // Does not match (/start is not "hi").
        dispatcher.on_message(vec![Arc::new(Text::contains("hi"))], move |_msg, _api| {
            let c = Arc::clone(&c1);
            async move {
                c.fetch_add(100, Ordering::SeqCst);
                Ok(())
            }
        });
        // First matching handler.
        dispatcher.on_message(vec![Arc::new(Command::any())], move |_msg, _api| {
            let c = Arc::clone(&c2);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        // Also matches, but must never run.
        dispatcher.on_message(vec![Arc::new(Command::new(["start"]))], move |_msg, _api| {
            let c = Arc::clone(&c3);
            async move {
                c.fetch_add(10, Ordering::SeqCst);
                Ok(())
            }
        });

        dispatcher.dispatch(&start_update(), api()).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_handler_still_consumes_the_update() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::clone(&counter);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_message(vec![], move |_msg, _api| async move {
            anyhow::bail!("handler blew up")
        });
        dispatcher.on_message(vec![], move |_msg, _api| {
            let c = Arc::clone(&c2);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        // The error is swallowed and the second handler never runs.
        dispatcher.dispatch(&start_update(), api()).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_match_is_a_silent_no_op() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&counter);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_message(vec![Arc::new(Text::contains("hi"))], move |_msg, _api| {
            let c = Arc::clone(&c1);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        dispatcher.dispatch(&start_update(), api()).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_kind_set_is_kind_agnostic() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&counter);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_update(vec![], move |_update, _api| {
            let c = Arc::clone(&c1);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        for raw in [
            json!({"update_type": "bot_started", "timestamp": 1}),
            json!({"update_type": "something_new", "timestamp": 2}),
            json!({"update_type": "chat_title_changed", "timestamp": 3}),
        ] {
            dispatcher.dispatch(&Update::from_value(raw), api()).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn callback_handler_receives_the_callback() {
        let got = Arc::new(parking_lot::Mutex::new(None));
        let got2 = Arc::clone(&got);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_callback(vec![], move |cb, _api| {
            let got = Arc::clone(&got2);
            async move {
                *got.lock() = Some(cb);
                Ok(())
            }
        });

        let update = Update::from_value(json!({
            "update_type": "message_callback",
            "timestamp": 2,
            "callback": {
                "callback_id": "cb7",
                "user": {"user_id": 2, "first_name": "Bo"},
                "payload": "menu:open"
            }
        }));
        dispatcher.dispatch(&update, api()).await;

        let cb = got.lock().take().expect("handler ran");
        assert_eq!(cb.callback_id, "cb7");
        assert_eq!(cb.payload.as_deref(), Some("menu:open"));
    }

    #[tokio::test]
    async fn handler_errors_do_not_leak_out_of_dispatch() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on_update(vec![], |_update, _api| async move {
            Err(ApiError::MissingToken.into())
        });
        // Must return normally, not propagate.
        dispatcher.dispatch(&start_update(), api()).await;
    }
}
