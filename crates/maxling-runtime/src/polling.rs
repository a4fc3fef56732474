//! Long-poll loop and cursor management.
//!
//! One logical flow of control owns the whole cycle:
//!
//! ```text
//! STOPPED -> STARTING -> POLLING -> STOPPING -> STOPPED
//!                          |  ^
//!                fetch page |  | advance marker
//!                          v  |
//!                 classify + dispatch in array order
//! ```
//!
//! The cursor ("marker") advances only after every record of a fetched page
//! has been dispatched, so a crash mid-page re-delivers the whole page on
//! restart: at-least-once, never silently-skipped. A failed fetch leaves the
//! marker untouched, sleeps a fixed delay and retries the identical request.
//!
//! There is no worker pool and no handler cancellation: a slow handler
//! stalls the rest of its page and the next fetch, and [`StopHandle::stop`]
//! only prevents the next cycle from starting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};

use maxling_api::MaxApi;
use maxling_core::model::{Update, UpdateKind};

use crate::dispatcher::Dispatcher;
use crate::error::RuntimeResult;

/// Delay between retries after a failed fetch. Fixed, no escalation: the
/// long-poll timeout already rate-limits the loop.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// Configuration
// ============================================================================

/// Poll-loop tuning.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Maximum updates per page, `1..=1000`.
    pub limit: u32,
    /// Long-poll timeout in seconds, `0..=90`. The fetch may block this
    /// long waiting for new updates.
    pub timeout_secs: u32,
    /// Sleep after a failed fetch before retrying the same marker.
    pub retry_delay: Duration,
    /// Restrict the kinds the platform sends; `None` means all.
    pub allowed_updates: Option<Vec<UpdateKind>>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            timeout_secs: 30,
            retry_delay: DEFAULT_RETRY_DELAY,
            allowed_updates: None,
        }
    }
}

// ============================================================================
// Loop State
// ============================================================================

/// Lifecycle state of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    /// Not running; the initial and final state.
    Stopped = 0,
    /// Fetching the bot identity and running the startup hook.
    Starting = 1,
    /// Executing poll cycles.
    Polling = 2,
    /// Loop exited; the shutdown hook is running.
    Stopping = 3,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Polling,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Clears the poll loop's running flag.
///
/// The in-flight cycle completes before the loop exits; nothing interrupts
/// a handler that is already executing.
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests the loop to stop after the current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Poll Loop
// ============================================================================

impl Dispatcher {
    /// Returns a handle that can stop the poll loop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Current lifecycle state of the poll loop.
    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Current stream cursor. `None` until the first successful cycle
    /// returns a marker.
    pub fn marker(&self) -> Option<i64> {
        self.marker
    }

    fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Runs the long-poll loop until [`StopHandle::stop`] is called.
    ///
    /// Fetching the bot identity fails fast: a bad token must not turn into
    /// an endless retry loop. The startup hook runs next (its failure is
    /// logged, startup continues), then cycles repeat until stopped. The
    /// shutdown hook runs once after the last cycle completes.
    pub async fn start_polling(
        &mut self,
        api: Arc<dyn MaxApi>,
        config: PollingConfig,
    ) -> RuntimeResult<()> {
        self.set_state(LoopState::Starting);
        let me = match api.get_me().await {
            Ok(me) => me,
            Err(e) => {
                self.set_state(LoopState::Stopped);
                return Err(e.into());
            }
        };
        info!(
            bot = %me.first_name,
            username = ?me.username,
            id = me.user_id,
            handlers = self.handler_count(),
            "starting long polling"
        );

        if let Some(hook) = &self.startup_hook
            && let Err(e) = hook().await
        {
            error!(error = ?e, "startup hook failed");
        }

        self.running.store(true, Ordering::SeqCst);
        self.set_state(LoopState::Polling);

        while self.running.load(Ordering::SeqCst) {
            self.poll_cycle(&api, &config).await;
        }

        self.set_state(LoopState::Stopping);
        if let Some(hook) = &self.shutdown_hook
            && let Err(e) = hook().await
        {
            error!(error = ?e, "shutdown hook failed");
        }
        self.set_state(LoopState::Stopped);
        info!("long polling stopped");
        Ok(())
    }

    /// One poll cycle: fetch a page, dispatch it in order, then advance the
    /// marker. The marker moves only here, and only after the whole page
    /// has been dispatched.
    async fn poll_cycle(&mut self, api: &Arc<dyn MaxApi>, config: &PollingConfig) {
        let page = match api
            .get_updates(
                self.marker,
                config.limit,
                config.timeout_secs,
                config.allowed_updates.as_deref(),
            )
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    error = %e,
                    marker = ?self.marker,
                    delay = ?config.retry_delay,
                    "update fetch failed, retrying with the same marker"
                );
                tokio::time::sleep(config.retry_delay).await;
                return;
            }
        };

        for raw in page.updates {
            let update = Update::from_value(raw);
            self.dispatch(&update, Arc::clone(api)).await;
        }

        if let Some(marker) = page.marker {
            self.marker = Some(marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use maxling_api::{ApiError, ApiResult, ChatAction, SendOptions, SendTarget, UpdatePage};
    use maxling_core::model::{BotInfo, Message};

    /// Scripted transport: pops one pre-programmed result per `get_updates`
    /// call, records the marker it was called with, and stops the loop when
    /// the script runs dry.
    struct ScriptedApi {
        script: Mutex<VecDeque<ApiResult<UpdatePage>>>,
        seen_markers: Mutex<Vec<Option<i64>>>,
        stop: StopHandle,
        fail_get_me: bool,
    }

    impl ScriptedApi {
        fn new(
            script: impl IntoIterator<Item = ApiResult<UpdatePage>>,
            stop: StopHandle,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                seen_markers: Mutex::new(Vec::new()),
                stop,
                fail_get_me: false,
            })
        }
    }

    #[async_trait]
    impl MaxApi for ScriptedApi {
        async fn get_me(&self) -> ApiResult<BotInfo> {
            if self.fail_get_me {
                return Err(ApiError::MissingToken);
            }
            Ok(BotInfo {
                user_id: 99,
                first_name: "bot".into(),
                ..Default::default()
            })
        }

        async fn get_updates(
            &self,
            marker: Option<i64>,
            _limit: u32,
            _timeout_secs: u32,
            _types: Option<&[UpdateKind]>,
        ) -> ApiResult<UpdatePage> {
            self.seen_markers.lock().push(marker);
            match self.script.lock().pop_front() {
                Some(result) => result,
                None => {
                    self.stop.stop();
                    Ok(UpdatePage::default())
                }
            }
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

    fn raw_message(text: &str) -> serde_json::Value {
        json!({
            "update_type": "message_created",
            "timestamp": 1,
            "message": {
                "sender": {"user_id": 1, "first_name": "Al"},
                "recipient": {"chat_id": 10, "chat_type": "dialog"},
                "body": {"mid": "m", "seq": 1, "text": text}
            }
        })
    }

    fn page(texts: &[&str], marker: Option<i64>) -> UpdatePage {
        UpdatePage {
            updates: texts.iter().map(|t| raw_message(t)).collect(),
            marker,
        }
    }

    fn fetch_error() -> ApiError {
        ApiError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
    }

    fn fast_config() -> PollingConfig {
        PollingConfig {
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn marker_follows_each_successful_cycle() {
        let mut dispatcher = Dispatcher::new();
        let api = ScriptedApi::new(
            [
                Ok(page(&["a"], Some(1))),
                Ok(page(&["b"], Some(2))),
                Ok(page(&["c"], Some(3))),
            ],
            dispatcher.stop_handle(),
        );

        dispatcher
            .start_polling(api.clone(), fast_config())
            .await
            .unwrap();

        assert_eq!(dispatcher.marker(), Some(3));
        // Each fetch used the marker from the previous successful cycle.
        assert_eq!(
            *api.seen_markers.lock(),
            vec![None, Some(1), Some(2), Some(3)]
        );
    }

    #[tokio::test]
    async fn failed_fetch_retries_the_identical_marker() {
        // Scenario: one good cycle, two transport failures, then recovery.
        let mut dispatcher = Dispatcher::new();
        let api = ScriptedApi::new(
            [
                Ok(page(&["a"], Some(4))),
                Err(fetch_error()),
                Err(fetch_error()),
                Ok(page(&["b"], Some(7))),
            ],
            dispatcher.stop_handle(),
        );

        dispatcher
            .start_polling(api.clone(), fast_config())
            .await
            .unwrap();

        assert_eq!(dispatcher.marker(), Some(7));
        // Both failed cycles re-sent marker 4, untouched.
        assert_eq!(
            *api.seen_markers.lock(),
            vec![None, Some(4), Some(4), Some(4), Some(7)]
        );
    }

    #[tokio::test]
    async fn page_is_dispatched_in_order_before_marker_advances() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let order2 = Arc::clone(&order);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_message(vec![], move |msg, _api| {
            let order = Arc::clone(&order2);
            async move {
                order.lock().push(msg.text().unwrap_or("").to_string());
                Ok(())
            }
        });

        let api = ScriptedApi::new(
            [Ok(page(&["one", "two", "three"], Some(11)))],
            dispatcher.stop_handle(),
        );
        dispatcher
            .start_polling(api, fast_config())
            .await
            .unwrap();

        assert_eq!(*order.lock(), vec!["one", "two", "three"]);
        assert_eq!(dispatcher.marker(), Some(11));
    }

    #[tokio::test]
    async fn absent_marker_re_delivers_the_page() {
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_message(vec![], move |_msg, _api| {
            let count = Arc::clone(&count2);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        // The platform hands out the same two records twice: first without a
        // marker (cursor must not move), then acknowledged with one.
        let api = ScriptedApi::new(
            [Ok(page(&["a", "b"], None)), Ok(page(&["a", "b"], Some(5)))],
            dispatcher.stop_handle(),
        );
        dispatcher
            .start_polling(api.clone(), fast_config())
            .await
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(dispatcher.marker(), Some(5));
        // The second fetch still used the initial cursor.
        assert_eq!(*api.seen_markers.lock(), vec![None, None, Some(5)]);
    }

    #[tokio::test]
    async fn handler_failure_does_not_abort_the_page_or_the_marker() {
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_message(vec![], move |msg, _api| {
            let count = Arc::clone(&count2);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                if msg.text() == Some("boom") {
                    anyhow::bail!("handler failed");
                }
                Ok(())
            }
        });

        let api = ScriptedApi::new(
            [Ok(page(&["boom", "after"], Some(8)))],
            dispatcher.stop_handle(),
        );
        dispatcher
            .start_polling(api, fast_config())
            .await
            .unwrap();

        // Both updates were handled and the page was acknowledged.
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.marker(), Some(8));
    }

    #[tokio::test]
    async fn lifecycle_hooks_run_once_and_failures_are_isolated() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let started2 = Arc::clone(&started);
        let stopped2 = Arc::clone(&stopped);

        let mut dispatcher = Dispatcher::new();
        dispatcher.on_startup(move || {
            let started = Arc::clone(&started2);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("startup hook failed")
            }
        });
        dispatcher.on_shutdown(move || {
            let stopped = Arc::clone(&stopped2);
            async move {
                stopped.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let api = ScriptedApi::new([Ok(page(&["a"], Some(1)))], dispatcher.stop_handle());
        // The failing startup hook must not abort polling.
        dispatcher
            .start_polling(api, fast_config())
            .await
            .unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.marker(), Some(1));
        assert_eq!(dispatcher.state(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn identity_failure_is_fatal_before_the_first_cycle() {
        let mut dispatcher = Dispatcher::new();
        let stop = dispatcher.stop_handle();
        let api = Arc::new(ScriptedApi {
            script: Mutex::new(VecDeque::new()),
            seen_markers: Mutex::new(Vec::new()),
            stop,
            fail_get_me: true,
        });

        let result = dispatcher.start_polling(api.clone(), fast_config()).await;
        assert!(result.is_err());
        assert!(api.seen_markers.lock().is_empty());
        assert_eq!(dispatcher.state(), LoopState::Stopped);
    }
}
