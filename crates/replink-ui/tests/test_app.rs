//! Full-context wiring tests: polling into snapshots, reconciliation, and
//! the command-completion status nudge.

use async_trait::async_trait;
use parking_lot::Mutex;
use replink_communication::{GcodeReply, Transport};
use replink_core::{ConfigResponse, DirListing, MachineState, TransportError, UiEvent};
use replink_ui::{AppContext, AppTuning, PanelView};
use replink_communication::UpdaterTuning;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct AppTransport {
    statuses: Mutex<VecDeque<String>>,
    status_fetches: AtomicUsize,
    config_json: Mutex<String>,
    config_fetches: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl AppTransport {
    fn new(first_status: &str) -> Arc<Self> {
        let mut statuses = VecDeque::new();
        statuses.push_back(first_status.to_string());
        Arc::new(Self {
            statuses: Mutex::new(statuses),
            status_fetches: AtomicUsize::new(0),
            config_json: Mutex::new(r#"{"options": []}"#.to_string()),
            config_fetches: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn push_status(&self, json: &str) {
        self.statuses.lock().push_back(json.to_string());
    }

    fn status_fetches(&self) -> usize {
        self.status_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for AppTransport {
    async fn fetch_status(&self) -> Result<MachineState, TransportError> {
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        let json = {
            // Advance to the newest scripted status, then keep serving it.
            let mut statuses = self.statuses.lock();
            if statuses.len() > 1 {
                statuses.pop_front();
            }
            statuses.front().cloned().unwrap_or_else(|| "{}".to_string())
        };
        serde_json::from_str(&json).map_err(|err| TransportError::InvalidPayload {
            reason: err.to_string(),
        })
    }

    async fn fetch_config(&self) -> Result<ConfigResponse, TransportError> {
        self.config_fetches.fetch_add(1, Ordering::SeqCst);
        let json = self.config_json.lock().clone();
        serde_json::from_str(&json).map_err(|err| TransportError::InvalidPayload {
            reason: err.to_string(),
        })
    }

    async fn send_gcode(
        &self,
        body: String,
        _progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<GcodeReply, TransportError> {
        self.sent.lock().push(body);
        Ok(GcodeReply {
            status_error: None,
            response: "ok\n".to_string(),
        })
    }

    async fn list_dir(&self, dir: &str) -> Result<DirListing, TransportError> {
        Ok(DirListing {
            dir: dir.to_string(),
            files: Vec::new(),
        })
    }

    async fn upload(
        &self,
        _dest_path: &str,
        _data: Vec<u8>,
        _progress: Arc<dyn Fn(u64, u64) + Send + Sync>,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Default)]
struct FakePanel {
    inputs: Mutex<HashMap<String, String>>,
}

impl FakePanel {
    fn set_input(&self, key: &str, value: &str) {
        self.inputs.lock().insert(key.to_string(), value.to_string());
    }
}

impl PanelView for FakePanel {
    fn input_value(&self, key: &str) -> Option<String> {
        self.inputs.lock().get(key).cloned()
    }

    fn refresh(&self) {}
}

fn slow_tuning() -> AppTuning {
    AppTuning {
        status: UpdaterTuning {
            refresh_interval: Duration::from_secs(600),
            waiting_resp_time: Duration::from_secs(300),
        },
        config: UpdaterTuning {
            refresh_interval: Duration::from_secs(600),
            waiting_resp_time: Duration::from_secs(300),
        },
        gcode_history_size: 20,
    }
}

async fn settle() {
    for _ in 0..200 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn polling_installs_snapshot_and_reports_events() {
    let transport = AppTransport::new(
        r#"{"active": true, "axes": {"X": {"pos": 1.5}}, "speedRatio": 1.0}"#,
    );
    let app = AppContext::new(transport.clone(), slow_tuning());
    let mut events = app.events.subscribe();

    app.start();
    settle().await;

    assert_eq!(app.machine_active(), Some(true));
    assert_eq!(app.machine.read().axes["X"].pos, 1.5);

    let mut saw_state_change = false;
    while let Ok(event) = events.try_recv() {
        if event == UiEvent::MachineStateChanged {
            saw_state_change = true;
        }
    }
    assert!(saw_state_change);
}

#[tokio::test]
async fn vanished_field_loses_its_pending_edit() {
    let transport = AppTransport::new(r#"{"axes": {"X": {"pos": 0.0}}}"#);
    let app = AppContext::new(transport.clone(), slow_tuning());

    let panel = Arc::new(FakePanel::default());
    app.axes.controller().set_component(panel.clone());

    app.start();
    settle().await;

    panel.set_input("target_X", "10");
    app.axes.controller().on_change("X");
    assert!(app.axes.controller().is_editing_any());

    // The axis disappears from the next report.
    transport.push_status(r#"{"axes": {"Y": {"pos": 0.0}}}"#);
    app.status_updater.request_update(true);
    settle().await;

    assert!(!app.axes.controller().is_editing("X"));
    assert!(!app.axes.controller().is_editing_any());
}

#[tokio::test]
async fn surviving_field_keeps_its_pending_edit() {
    let transport = AppTransport::new(r#"{"axes": {"X": {"pos": 0.0}}}"#);
    let app = AppContext::new(transport.clone(), slow_tuning());

    let panel = Arc::new(FakePanel::default());
    app.axes.controller().set_component(panel.clone());

    app.start();
    settle().await;

    panel.set_input("target_X", "42");
    app.axes.controller().on_change("X");

    transport.push_status(r#"{"axes": {"X": {"pos": 99.0}}}"#);
    app.status_updater.request_update(true);
    settle().await;

    let inputs = app.axes.controller().render_inputs("X", "99.0000");
    assert!(inputs.editing);
    assert_eq!(inputs.value, "42");
}

#[tokio::test]
async fn command_completion_nudges_the_status_poll() {
    let transport = AppTransport::new("{}");
    let app = AppContext::new(transport.clone(), slow_tuning());

    app.start();
    settle().await;
    let after_start = transport.status_fetches();
    assert_eq!(after_start, 1);

    app.axes.home();
    settle().await;

    assert_eq!(*transport.sent.lock(), vec!["G28\n"]);
    assert!(transport.status_fetches() >= after_start + 1);
}

#[tokio::test]
async fn config_poller_runs_only_when_firmware_reports_config() {
    let transport = AppTransport::new(r#"{"configDirty": false}"#);
    *transport.config_json.lock() =
        r#"{"options": [{"nameval": "XMin=-10.5", "type": "double"}]}"#.to_string();
    let app = AppContext::new(transport.clone(), slow_tuning());

    app.start();
    settle().await;

    assert!(transport.config_fetches.load(Ordering::SeqCst) >= 1);
    let options = app.options.read();
    let option = options.get("XMin").expect("config option parsed");
    assert_eq!(option.value, "-10.5");
    drop(options);

    // A machine without a configuration store turns the poller off.
    transport.push_status("{}");
    app.status_updater.request_update(true);
    settle().await;
    assert_eq!(
        app.config_updater.condition(),
        replink_communication::Condition::Disabled
    );
}

#[tokio::test]
async fn command_failure_opens_error_dialog() {
    let transport = AppTransport::new("{}");

    // The device answers with its error convention on HTTP success.
    struct FailingTransport(Arc<AppTransport>);

    #[async_trait]
    impl Transport for FailingTransport {
        async fn fetch_status(&self) -> Result<MachineState, TransportError> {
            self.0.fetch_status().await
        }

        async fn fetch_config(&self) -> Result<ConfigResponse, TransportError> {
            self.0.fetch_config().await
        }

        async fn send_gcode(
            &self,
            _body: String,
            _progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
        ) -> Result<GcodeReply, TransportError> {
            Ok(GcodeReply {
                status_error: None,
                response: "Error: bed not homed\n".to_string(),
            })
        }

        async fn list_dir(&self, dir: &str) -> Result<DirListing, TransportError> {
            self.0.list_dir(dir).await
        }

        async fn upload(
            &self,
            dest_path: &str,
            data: Vec<u8>,
            progress: Arc<dyn Fn(u64, u64) + Send + Sync>,
        ) -> Result<(), TransportError> {
            self.0.upload(dest_path, data, progress).await
        }
    }

    let failing = Arc::new(FailingTransport(transport));
    let app = AppContext::new(failing, slow_tuning());
    app.start();
    settle().await;

    app.axes.probe();
    settle().await;

    let dialog = app.dialogs.current().expect("error dialog queued");
    match dialog {
        replink_ui::Dialog::Error { label, body } => {
            assert!(label.contains("Probe bed"));
            assert!(label.contains("The machine responded with:"));
            assert_eq!(body.as_deref(), Some("Error: bed not homed\n"));
        }
        other => panic!("expected error dialog, got {other:?}"),
    }

    let history = app.sequencer.history_snapshot();
    assert!(history[0].is_error);
    assert_eq!(history[0].error, None);
}
