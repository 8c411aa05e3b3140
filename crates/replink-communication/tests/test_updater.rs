//! Status updater integration tests against a scripted source.

use async_trait::async_trait;
use parking_lot::Mutex;
use replink_communication::{Condition, StatusSource, StatusUpdater, UpdaterTuning};
use replink_core::TransportError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

struct SourceInner {
    gate: Semaphore,
    started: AtomicUsize,
    results: Mutex<VecDeque<Result<u32, TransportError>>>,
}

/// Source whose fetches block until the test opens the gate.
#[derive(Clone)]
struct ScriptedSource(Arc<SourceInner>);

impl ScriptedSource {
    fn new() -> Self {
        Self(Arc::new(SourceInner {
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
            results: Mutex::new(VecDeque::new()),
        }))
    }

    fn open(&self, permits: usize) {
        self.0.gate.add_permits(permits);
    }

    fn push_result(&self, result: Result<u32, TransportError>) {
        self.0.results.lock().push_back(result);
    }

    fn started(&self) -> usize {
        self.0.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    type Payload = u32;

    async fn fetch(&self) -> Result<u32, TransportError> {
        self.0.started.fetch_add(1, Ordering::SeqCst);
        let permit = self.0.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.0.results.lock().pop_front().unwrap_or(Ok(0))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Long intervals so scheduled polls never fire within a test on the
/// unpaused clock.
fn slow_tuning() -> UpdaterTuning {
    UpdaterTuning {
        refresh_interval: Duration::from_secs(600),
        waiting_resp_time: Duration::from_secs(300),
    }
}

async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

fn counting_handler(counter: Arc<AtomicUsize>) -> Box<dyn Fn(u32) + Send + Sync> {
    Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test]
async fn pending_update_requests_coalesce_into_one() {
    let source = ScriptedSource::new();
    let updater = StatusUpdater::new(
        source.clone(),
        slow_tuning(),
        Box::new(|_| {}),
        Box::new(|| {}),
    );

    updater.set_running(true);
    settle().await;
    assert_eq!(source.started(), 1);

    // Two more requests while one is outstanding collapse into a single
    // follow-up fetch.
    updater.request_update(true);
    updater.request_update(true);
    settle().await;
    assert_eq!(source.started(), 1);

    source.open(1);
    settle().await;
    assert_eq!(source.started(), 2);

    source.open(1);
    settle().await;
    assert_eq!(source.started(), 2);

    updater.set_running(false);
}

#[tokio::test]
async fn condition_reflects_poll_outcomes() {
    let source = ScriptedSource::new();
    let updater = StatusUpdater::new(
        source.clone(),
        slow_tuning(),
        Box::new(|_| {}),
        Box::new(|| {}),
    );

    assert_eq!(updater.condition(), Condition::Disabled);

    updater.set_running(true);
    settle().await;
    assert_eq!(updater.condition(), Condition::WaitingResponse);

    source.open(1);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    source.push_result(Err(TransportError::Network {
        reason: "unreachable".to_string(),
    }));
    updater.request_update(true);
    settle().await;
    assert_eq!(updater.condition(), Condition::WaitingResponse);
    source.open(1);
    settle().await;
    assert_eq!(updater.condition(), Condition::Error);

    updater.request_update(true);
    source.open(1);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    updater.set_running(false);
    assert_eq!(updater.condition(), Condition::Disabled);
}

#[tokio::test]
async fn okay_flicker_is_suppressed_when_followup_is_due() {
    let source = ScriptedSource::new();
    let updater = StatusUpdater::new(
        source.clone(),
        slow_tuning(),
        Box::new(|_| {}),
        Box::new(|| {}),
    );

    updater.set_running(true);
    settle().await;
    updater.request_update(true);
    settle().await;

    source.open(1);
    settle().await;
    // The first poll completed but a follow-up started immediately; the
    // condition must not dip to Okay in between.
    assert_eq!(updater.condition(), Condition::WaitingResponse);
    assert_eq!(source.started(), 2);

    source.open(1);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    updater.set_running(false);
}

#[tokio::test]
async fn disabling_discards_stale_completion() {
    let source = ScriptedSource::new();
    let payloads = Arc::new(AtomicUsize::new(0));
    let updater = StatusUpdater::new(
        source.clone(),
        slow_tuning(),
        counting_handler(payloads.clone()),
        Box::new(|| {}),
    );

    updater.set_running(true);
    settle().await;
    assert_eq!(source.started(), 1);

    updater.set_running(false);
    assert_eq!(updater.condition(), Condition::Disabled);

    // The outstanding request completes after the channel was disabled;
    // its result must be ignored.
    source.open(1);
    settle().await;
    assert_eq!(updater.condition(), Condition::Disabled);
    assert_eq!(payloads.load(Ordering::SeqCst), 0);
    assert_eq!(source.started(), 1);
}

#[tokio::test]
async fn payload_handler_receives_each_success() {
    let source = ScriptedSource::new();
    let payloads = Arc::new(AtomicUsize::new(0));
    let updater = StatusUpdater::new(
        source.clone(),
        slow_tuning(),
        counting_handler(payloads.clone()),
        Box::new(|| {}),
    );

    updater.set_running(true);
    source.open(1);
    settle().await;
    assert_eq!(payloads.load(Ordering::SeqCst), 1);

    updater.request_update(false);
    source.open(1);
    settle().await;
    assert_eq!(payloads.load(Ordering::SeqCst), 2);

    updater.set_running(false);
}

#[tokio::test(start_paused = true)]
async fn waiting_indicator_is_delayed_for_unforced_updates() {
    let source = ScriptedSource::new();
    let tuning = UpdaterTuning {
        refresh_interval: Duration::from_secs(600),
        waiting_resp_time: Duration::from_secs(1),
    };
    let updater = StatusUpdater::new(source.clone(), tuning, Box::new(|_| {}), Box::new(|| {}));

    updater.set_running(true);
    source.open(1);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    // An unforced refresh keeps the Okay indicator during the grace delay.
    updater.request_update(false);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    tokio::time::advance(Duration::from_millis(1100)).await;
    settle().await;
    assert_eq!(updater.condition(), Condition::WaitingResponse);

    source.open(1);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    updater.set_running(false);
}

#[tokio::test(start_paused = true)]
async fn fast_response_never_shows_waiting() {
    let source = ScriptedSource::new();
    let tuning = UpdaterTuning {
        refresh_interval: Duration::from_secs(600),
        waiting_resp_time: Duration::from_secs(1),
    };

    let updater = StatusUpdater::new(source.clone(), tuning, Box::new(|_| {}), Box::new(|| {}));

    updater.set_running(true);
    source.open(2);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    // Unforced refresh that completes immediately: the waiting indicator
    // never appears, even after the grace delay elapses.
    updater.request_update(false);
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);
    tokio::time::advance(Duration::from_millis(1100)).await;
    settle().await;
    assert_eq!(updater.condition(), Condition::Okay);

    updater.set_running(false);
}
