//! Periodic status polling
//!
//! A [`StatusUpdater`] owns one polling channel: it fetches a payload from
//! its [`StatusSource`], hands it to a handler, and schedules the next
//! fetch after a fixed interval. At most one request is in flight;
//! `request_update` while one is outstanding coalesces into a single
//! follow-up fetch. A liveness condition summarizes the channel for the UI,
//! with a short grace delay before `WaitingResponse` shows so fast
//! responses never flicker the indicator.

use crate::transport::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use replink_core::{Callback, ConfigResponse, DataCallback, MachineState, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Poll channel liveness for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Polling is off
    Disabled,
    /// A request has been outstanding long enough to mention
    WaitingResponse,
    /// Last poll succeeded
    Okay,
    /// Last poll failed
    Error,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Disabled => write!(f, "Disabled"),
            Condition::WaitingResponse => write!(f, "Waiting for response"),
            Condition::Okay => write!(f, "Okay"),
            Condition::Error => write!(f, "Error"),
        }
    }
}

/// Something the updater can poll.
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    /// Parsed payload of one successful poll
    type Payload: Send + 'static;

    /// Perform one fetch.
    async fn fetch(&self) -> Result<Self::Payload, TransportError>;

    /// Channel name for logging
    fn name(&self) -> &'static str;
}

/// Machine status channel (`rr_status`)
pub struct MachineStatusSource {
    transport: Arc<dyn Transport>,
}

impl MachineStatusSource {
    /// Create a machine-status source over a transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl StatusSource for MachineStatusSource {
    type Payload = MachineState;

    async fn fetch(&self) -> Result<MachineState, TransportError> {
        self.transport.fetch_status().await
    }

    fn name(&self) -> &'static str {
        "status"
    }
}

/// Configuration channel (`rr_config`)
pub struct ConfigSource {
    transport: Arc<dyn Transport>,
}

impl ConfigSource {
    /// Create a configuration source over a transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl StatusSource for ConfigSource {
    type Payload = ConfigResponse;

    async fn fetch(&self) -> Result<ConfigResponse, TransportError> {
        self.transport.fetch_config().await
    }

    fn name(&self) -> &'static str {
        "config"
    }
}

/// Poll cadence of one channel.
#[derive(Debug, Clone, Copy)]
pub struct UpdaterTuning {
    /// Fixed interval between polls
    pub refresh_interval: Duration,
    /// Grace delay before the waiting indicator shows
    pub waiting_resp_time: Duration,
}

impl UpdaterTuning {
    /// Machine status cadence
    pub fn status() -> Self {
        Self {
            refresh_interval: Duration::from_millis(2000),
            waiting_resp_time: Duration::from_millis(1000),
        }
    }

    /// Configuration cadence; config changes rarely on its own
    pub fn config() -> Self {
        Self {
            refresh_interval: Duration::from_millis(120_000),
            waiting_resp_time: Duration::from_millis(1500),
        }
    }
}

struct UpdaterState {
    running: bool,
    request_in_progress: bool,
    needs_another_update: bool,
    condition: Condition,
    poll_timer: Option<JoinHandle<()>>,
    poll_generation: u64,
    waiting_timer: Option<JoinHandle<()>>,
    waiting_generation: u64,
}

impl UpdaterState {
    fn stop_poll_timer(&mut self) {
        self.poll_generation += 1;
        if let Some(timer) = self.poll_timer.take() {
            timer.abort();
        }
    }

    fn stop_waiting_timer(&mut self) {
        self.waiting_generation += 1;
        if let Some(timer) = self.waiting_timer.take() {
            timer.abort();
        }
    }
}

/// One polling channel with at-most-one-in-flight coalescing.
pub struct StatusUpdater<S: StatusSource> {
    source: S,
    tuning: UpdaterTuning,
    handle_new_payload: DataCallback<S::Payload>,
    handle_condition: Callback,
    state: Mutex<UpdaterState>,
}

impl<S: StatusSource> StatusUpdater<S> {
    /// Create an updater; it stays `Disabled` until `set_running(true)`.
    pub fn new(
        source: S,
        tuning: UpdaterTuning,
        handle_new_payload: DataCallback<S::Payload>,
        handle_condition: Callback,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            tuning,
            handle_new_payload,
            handle_condition,
            state: Mutex::new(UpdaterState {
                running: false,
                request_in_progress: false,
                needs_another_update: false,
                condition: Condition::Disabled,
                poll_timer: None,
                poll_generation: 0,
                waiting_timer: None,
                waiting_generation: 0,
            }),
        })
    }

    /// Current channel condition.
    pub fn condition(&self) -> Condition {
        self.state.lock().condition
    }

    /// Toggle polling.
    ///
    /// Turning on issues a request immediately; turning off cancels pending
    /// timers and forces the condition to `Disabled`. An outstanding
    /// request is not aborted, but its eventual completion is discarded.
    pub fn set_running(self: &Arc<Self>, running: bool) {
        if running {
            let start = {
                let mut state = self.state.lock();
                if state.running {
                    false
                } else {
                    state.running = true;
                    true
                }
            };
            if start {
                self.request_update(true);
            }
        } else {
            {
                let mut state = self.state.lock();
                if !state.running {
                    return;
                }
                state.running = false;
                state.condition = Condition::Disabled;
                state.stop_poll_timer();
                state.stop_waiting_timer();
            }
            (self.handle_condition)();
        }
    }

    /// Request a poll soon.
    ///
    /// While a request is outstanding this coalesces into one follow-up
    /// fetch after the current one completes; it never issues a concurrent
    /// request and never reorders. With `set_waiting` the condition shows
    /// `WaitingResponse` immediately instead of after the grace delay.
    pub fn request_update(self: &Arc<Self>, set_waiting: bool) {
        let mut condition_changed = false;
        let start = {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            if set_waiting {
                if state.condition != Condition::WaitingResponse {
                    state.condition = Condition::WaitingResponse;
                    condition_changed = true;
                }
                state.stop_waiting_timer();
            }
            if state.request_in_progress {
                state.needs_another_update = true;
                false
            } else {
                true
            }
        };
        if condition_changed {
            (self.handle_condition)();
        }
        if start {
            self.start_request();
        }
    }

    fn start_request(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.stop_poll_timer();
            state.request_in_progress = true;
            state.needs_another_update = false;

            state.stop_waiting_timer();
            let generation = state.waiting_generation;
            let updater = self.clone();
            let delay = self.tuning.waiting_resp_time;
            state.waiting_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                updater.waiting_timer_fired(generation);
            }));
        }

        let updater = self.clone();
        tokio::spawn(async move {
            let result = updater.source.fetch().await;
            updater.request_completed(result);
        });
    }

    fn waiting_timer_fired(self: &Arc<Self>, generation: u64) {
        let changed = {
            let mut state = self.state.lock();
            if !state.running || state.waiting_generation != generation {
                return;
            }
            state.waiting_timer = None;
            // An Error condition is not downgraded by a slow retry.
            if state.condition != Condition::Error
                && state.condition != Condition::WaitingResponse
            {
                state.condition = Condition::WaitingResponse;
                true
            } else {
                false
            }
        };
        if changed {
            (self.handle_condition)();
        }
    }

    fn poll_timer_fired(self: &Arc<Self>, generation: u64) {
        let start = {
            let state = self.state.lock();
            state.running && !state.request_in_progress && state.poll_generation == generation
        };
        if start {
            self.start_request();
        }
    }

    fn request_completed(self: &Arc<Self>, result: Result<S::Payload, TransportError>) {
        let mut condition_changed = false;
        let start_again;
        {
            let mut state = self.state.lock();
            state.request_in_progress = false;
            if !state.running {
                // Disabled while the request was in flight; the result is
                // stale and must not resurrect the channel.
                return;
            }
            state.stop_waiting_timer();

            // When a follow-up request is already due, leaving the
            // condition at WaitingResponse avoids an Okay flicker.
            if !(state.condition == Condition::WaitingResponse && state.needs_another_update) {
                let new_condition = if result.is_ok() {
                    Condition::Okay
                } else {
                    Condition::Error
                };
                if state.condition != new_condition {
                    state.condition = new_condition;
                    condition_changed = true;
                }
            }

            start_again = state.needs_another_update;
            if !start_again {
                state.stop_poll_timer();
                let generation = state.poll_generation;
                let updater = self.clone();
                let interval = self.tuning.refresh_interval;
                state.poll_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(interval).await;
                    updater.poll_timer_fired(generation);
                }));
            }
        }

        if condition_changed {
            (self.handle_condition)();
        }
        if start_again {
            self.start_request();
        }
        match result {
            Ok(payload) => (self.handle_new_payload)(payload),
            Err(err) => {
                tracing::warn!("{} poll failed: {}", self.source.name(), err);
            }
        }
    }
}
