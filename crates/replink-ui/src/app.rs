//! Application context
//!
//! One [`AppContext`] constructed at startup owns every component and
//! carries the cross-component wiring: fresh machine state replaces the
//! snapshot wholesale and is reconciled into every edit controller before
//! any render reads it; command completions nudge the status poller; the
//! config poller runs only while the firmware reports a configuration
//! store.

use crate::dialog::DialogQueue;
use crate::edit::{EditController, RowRefChildComponent, RowRefSameComponent};
use crate::panels::{
    AxesPanel, ConfigPanel, FansPanel, HeatersPanel, SdCardPanel, SpeedPanel, SPEED_FIELD_ID,
};
use parking_lot::RwLock;
use replink_communication::{
    CommandSequencer, Condition, ConfigSource, DirListController, DirListHooks,
    FileUploadController, MachineStatusSource, SequencerHooks, StatusUpdater, Transport,
    UpdaterTuning, UploadHooks, GCODE_HISTORY_SIZE,
};
use replink_core::{
    parse_options_list, ConfigOption, ConfigResponse, EventDispatcher, MachineState, MountState,
    ThreadSafeRw, UiEvent,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Cadence and bounds of one dashboard session.
#[derive(Debug, Clone, Copy)]
pub struct AppTuning {
    /// Machine-status poll cadence
    pub status: UpdaterTuning,
    /// Configuration poll cadence
    pub config: UpdaterTuning,
    /// Bound on command queue + history length
    pub gcode_history_size: usize,
}

impl Default for AppTuning {
    fn default() -> Self {
        Self {
            status: UpdaterTuning::status(),
            config: UpdaterTuning::config(),
            gcode_history_size: GCODE_HISTORY_SIZE,
        }
    }
}

/// Top-level ownership of every dashboard component.
pub struct AppContext {
    /// Render-invalidation fan-out
    pub events: EventDispatcher,
    /// Machine-state snapshot, replaced wholesale on each poll
    pub machine: ThreadSafeRw<MachineState>,
    /// Configuration snapshot
    pub options: ThreadSafeRw<BTreeMap<String, ConfigOption>>,
    /// Outgoing command channel
    pub sequencer: Arc<CommandSequencer>,
    /// Machine-status poller
    pub status_updater: Arc<StatusUpdater<MachineStatusSource>>,
    /// Configuration poller
    pub config_updater: Arc<StatusUpdater<ConfigSource>>,
    /// Modal dialog queue
    pub dialogs: Arc<DialogQueue>,
    /// Directory-listing controller
    pub dirlist: Arc<DirListController>,
    /// Upload controller
    pub upload: Arc<FileUploadController>,
    /// Axes table
    pub axes: AxesPanel,
    /// Heaters table
    pub heaters: HeatersPanel,
    /// Fans table
    pub fans: FansPanel,
    /// Speed-ratio table
    pub speed: SpeedPanel,
    /// Configuration table
    pub config: ConfigPanel,
    /// SD-card tab
    pub sdcard: SdCardPanel,
}

impl AppContext {
    /// Build and wire every component. Polling stays off until
    /// [`AppContext::start`].
    pub fn new(transport: Arc<dyn Transport>, tuning: AppTuning) -> Arc<Self> {
        let events = EventDispatcher::default();
        let machine: ThreadSafeRw<MachineState> = Arc::new(RwLock::new(MachineState::default()));
        let options: ThreadSafeRw<BTreeMap<String, ConfigOption>> =
            Arc::new(RwLock::new(BTreeMap::new()));

        let dialogs = {
            let events = events.clone();
            DialogQueue::new(Box::new(move || events.publish(UiEvent::DialogChanged)))
        };

        let axes_controller = EditController::new(RowRefSameComponent::new("target_"));
        let heaters_controller = EditController::new(RowRefSameComponent::new("target_"));
        let fans_controller = EditController::new(RowRefSameComponent::new("target_"));
        let speed_controller = EditController::new(RowRefSameComponent::new("target_"));
        let config_controller = EditController::new(RowRefChildComponent::new("target"));

        let config_updater = {
            let options = options.clone();
            let events = events.clone();
            let config_controller = config_controller.clone();
            let condition_events = events.clone();
            StatusUpdater::new(
                ConfigSource::new(transport.clone()),
                tuning.config,
                Box::new(move |response: ConfigResponse| {
                    *options.write() = parse_options_list(&response.options);
                    {
                        let options = options.read();
                        config_controller.reconcile(options.keys().map(String::as_str));
                    }
                    config_controller.force_refresh();
                    events.publish(UiEvent::ConfigChanged);
                }),
                Box::new(move || condition_events.publish(UiEvent::ConfigCondition)),
            )
        };

        let status_updater = {
            let machine = machine.clone();
            let events = events.clone();
            let config_updater = config_updater.clone();
            let axes_controller = axes_controller.clone();
            let heaters_controller = heaters_controller.clone();
            let fans_controller = fans_controller.clone();
            let speed_controller = speed_controller.clone();
            let config_controller = config_controller.clone();
            let condition_events = events.clone();
            StatusUpdater::new(
                MachineStatusSource::new(transport.clone()),
                tuning.status,
                Box::new(move |new_state: MachineState| {
                    *machine.write() = new_state;
                    {
                        // Reconcile before anything renders the snapshot:
                        // a field that vanished from the report must not
                        // keep a pending edit alive.
                        let machine = machine.read();
                        axes_controller.reconcile(machine.axes.keys().map(String::as_str));
                        heaters_controller
                            .reconcile(machine.heaters.keys().map(String::as_str));
                        fans_controller.reconcile(machine.fans.keys().map(String::as_str));
                        speed_controller.reconcile(std::iter::once(SPEED_FIELD_ID));
                    }
                    axes_controller.force_refresh();
                    heaters_controller.force_refresh();
                    fans_controller.force_refresh();
                    speed_controller.force_refresh();
                    config_controller.force_refresh();
                    config_updater.set_running(machine.read().config_dirty.is_some());
                    if config_updater.condition() == Condition::Error {
                        config_updater.request_update(false);
                    }
                    events.publish(UiEvent::MachineStateChanged);
                }),
                Box::new(move || condition_events.publish(UiEvent::StatusCondition)),
            )
        };

        let sequencer = {
            let events = events.clone();
            let status_updater = status_updater.clone();
            let dialogs = dialogs.clone();
            CommandSequencer::with_history_size(
                transport.clone(),
                SequencerHooks {
                    on_changed: Box::new(move || events.publish(UiEvent::GcodeChanged)),
                    request_status_refresh: Box::new(move || status_updater.request_update(false)),
                    on_command_error: Box::new(move |entry| {
                        let (head, body) = match entry.error.as_deref() {
                            Some(error) => ("Communication error", error.to_string()),
                            None => ("The machine responded with:", entry.response.clone()),
                        };
                        dialogs.show_error(&entry.reason, head, Some(&body));
                    }),
                },
                tuning.gcode_history_size,
            )
        };

        let dirlist = {
            let events = events.clone();
            let dialogs = dialogs.clone();
            let status_updater = status_updater.clone();
            let machine = machine.clone();
            DirListController::new(
                transport.clone(),
                DirListHooks {
                    on_dir_loaded: Box::new(move || events.publish(UiEvent::DirListChanged)),
                    on_error: Box::new(move |action, error| {
                        dialogs.show_error(action, error, None)
                    }),
                    request_status_refresh: Box::new(move || {
                        status_updater.request_update(false)
                    }),
                    should_nudge_status: Box::new(move || {
                        matches!(
                            machine.read().sdcard,
                            Some(card) if card.mnt_state != MountState::Mounted
                        )
                    }),
                },
            )
        };

        let upload = {
            let events = events.clone();
            let dialogs = dialogs.clone();
            FileUploadController::new(
                transport.clone(),
                UploadHooks {
                    on_update: Box::new(move || events.publish(UiEvent::UploadChanged)),
                    on_error: Box::new(move |action, error| {
                        dialogs.show_error(action, error, None)
                    }),
                },
            )
        };

        let refresh_config: Arc<dyn Fn() + Send + Sync> = {
            let config_updater = config_updater.clone();
            Arc::new(move || config_updater.request_update(true))
        };

        let axes = AxesPanel::new(
            axes_controller,
            sequencer.clone(),
            dialogs.clone(),
            machine.clone(),
        );
        let heaters = HeatersPanel::new(
            heaters_controller,
            sequencer.clone(),
            dialogs.clone(),
            machine.clone(),
        );
        let fans = FansPanel::new(
            fans_controller,
            sequencer.clone(),
            dialogs.clone(),
            machine.clone(),
        );
        let speed = SpeedPanel::new(
            speed_controller,
            sequencer.clone(),
            dialogs.clone(),
            machine.clone(),
        );
        let config = ConfigPanel::new(
            config_controller,
            sequencer.clone(),
            dialogs.clone(),
            options.clone(),
            refresh_config,
        );
        let sdcard = SdCardPanel::new(
            sequencer.clone(),
            dialogs.clone(),
            dirlist.clone(),
            upload.clone(),
            machine.clone(),
        );

        Arc::new(Self {
            events,
            machine,
            options,
            sequencer,
            status_updater,
            config_updater,
            dialogs,
            dirlist,
            upload,
            axes,
            heaters,
            fans,
            speed,
            config,
            sdcard,
        })
    }

    /// Begin polling the machine.
    pub fn start(&self) {
        self.status_updater.set_running(true);
    }

    /// Force both pollers to refresh now.
    pub fn refresh_all(&self) {
        self.status_updater.request_update(true);
        self.config_updater.request_update(true);
    }

    /// Send a manually typed command line.
    pub fn send_manual_command(&self, command: &str) {
        if !command.is_empty() {
            self.sequencer.send("Send command", command, None);
        }
    }

    /// Whether the machine reports itself active, if known.
    pub fn machine_active(&self) -> Option<bool> {
        self.machine.read().active
    }

    /// Reason label for the "Executing:" indicator.
    pub fn executing_reason(&self) -> Option<String> {
        self.sequencer.executing_reason()
    }
}
