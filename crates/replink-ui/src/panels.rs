//! Per-field-group panels
//!
//! One panel per dashboard table. A panel owns the group's edit controller
//! and turns submissions into G-code through the sequencer, validating
//! locally first: a value that does not parse produces an error dialog and
//! no network call, and the field's edit state stays put so the user can
//! correct it.

use crate::dialog::DialogQueue;
use crate::edit::EditController;
use replink_communication::{
    CommandCallback, CommandSequencer, DirListController, FileUploadController,
};
use replink_core::{
    format_precision, gcode, paths, ConfigOption, FanStatus, HeaterStatus, MachineState,
    MountState, OptionKind, RwState, ThreadSafeRw, ValidationError, AXIS_PRECISION,
    FAN_PRECISION, HEATER_PRECISION, SPEED_PRECISION,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field id of the single speed-ratio pseudo-field
pub const SPEED_FIELD_ID: &str = "S";

/// Default move speed offered by the UI, in units per second
pub const DEFAULT_MOVE_SPEED: f64 = 50.0;

/// URL prefix under which the server exposes SD-card files for download
pub const SD_ROOT_ACCESS_PREFIX: &str = "/sdcard";

fn bad_target(group: &str, name: &str) -> ValidationError {
    ValidationError::BadTarget {
        group: group.to_string(),
        name: name.to_string(),
    }
}

/// Axes table: per-axis and combined moves, homing, probing, motors off.
pub struct AxesPanel {
    controller: Arc<EditController>,
    sequencer: Arc<CommandSequencer>,
    dialogs: Arc<DialogQueue>,
    machine: ThreadSafeRw<MachineState>,
}

impl AxesPanel {
    /// Create the axes panel.
    pub fn new(
        controller: Arc<EditController>,
        sequencer: Arc<CommandSequencer>,
        dialogs: Arc<DialogQueue>,
        machine: ThreadSafeRw<MachineState>,
    ) -> Self {
        Self {
            controller,
            sequencer,
            dialogs,
            machine,
        }
    }

    /// The group's edit controller.
    pub fn controller(&self) -> &Arc<EditController> {
        &self.controller
    }

    /// Parse the speed input (units/s) into a feed rate (units/min).
    fn parse_speed(speed_input: &str) -> Result<f64, ValidationError> {
        let speed: f64 = speed_input
            .trim()
            .parse()
            .map_err(|_| ValidationError::BadSpeed)?;
        if speed == 0.0 || !speed.is_finite() {
            return Err(ValidationError::BadSpeed);
        }
        Ok(speed * 60.0)
    }

    /// Move one axis to its edited target.
    pub fn go_axis(&self, axis: &str, speed_input: &str) {
        let action = "Move axis";
        let feed = match Self::parse_speed(speed_input) {
            Ok(feed) => feed,
            Err(err) => return self.dialogs.show_error(action, &err.to_string(), None),
        };
        let Some(target) = self.controller.number_value(axis) else {
            let err = bad_target("axis", axis);
            return self.dialogs.show_error(action, &err.to_string(), None);
        };
        self.sequencer
            .send(action, gcode::move_axes(feed, &[(axis, target)]), None);
        self.controller.cancel(axis);
    }

    /// Move every edited axis in one combined command.
    pub fn go_all(&self, speed_input: &str) {
        let axis_names: Vec<String> = self.machine.read().axes.keys().cloned().collect();
        let mut targets: Vec<(String, f64)> = Vec::new();
        let mut edited = 0usize;
        let mut first_error: Option<ValidationError> = None;
        for name in &axis_names {
            if !self.controller.is_editing(name) {
                continue;
            }
            edited += 1;
            match self.controller.number_value(name) {
                Some(target) => targets.push((name.clone(), target)),
                None => {
                    if first_error.is_none() {
                        first_error = Some(bad_target("axis", name));
                    }
                }
            }
        }
        let action = if edited > 1 { "Move axes" } else { "Move axis" };
        if let Some(err) = first_error {
            return self.dialogs.show_error(action, &err.to_string(), None);
        }
        let feed = match Self::parse_speed(speed_input) {
            Ok(feed) => feed,
            Err(err) => return self.dialogs.show_error(action, &err.to_string(), None),
        };
        if targets.is_empty() {
            return;
        }
        let target_refs: Vec<(&str, f64)> = targets
            .iter()
            .map(|(name, target)| (name.as_str(), *target))
            .collect();
        self.sequencer
            .send(action, gcode::move_axes(feed, &target_refs), None);
        self.controller.cancel_all();
    }

    /// Home all axes.
    pub fn home(&self) {
        self.sequencer.send("Home axes", gcode::home_axes(), None);
    }

    /// Probe the bed. Only offered when the firmware reports a probe.
    pub fn probe(&self) {
        self.sequencer.send("Probe bed", gcode::probe_bed(), None);
    }

    /// Disable steppers.
    pub fn motors_off(&self) {
        self.sequencer
            .send("Turn motors off", gcode::motors_off(), None);
    }

    /// Whether the probe button applies.
    pub fn probe_available(&self) -> bool {
        self.machine.read().has_bed_probe()
    }

    /// Display form of an axis position.
    pub fn display_position(pos: f64) -> String {
        format_precision(pos, AXIS_PRECISION)
    }
}

/// Heaters table: setpoints, off buttons, combined set.
pub struct HeatersPanel {
    controller: Arc<EditController>,
    sequencer: Arc<CommandSequencer>,
    dialogs: Arc<DialogQueue>,
    machine: ThreadSafeRw<MachineState>,
}

impl HeatersPanel {
    /// Create the heaters panel.
    pub fn new(
        controller: Arc<EditController>,
        sequencer: Arc<CommandSequencer>,
        dialogs: Arc<DialogQueue>,
        machine: ThreadSafeRw<MachineState>,
    ) -> Self {
        Self {
            controller,
            sequencer,
            dialogs,
            machine,
        }
    }

    /// The group's edit controller.
    pub fn controller(&self) -> &Arc<EditController> {
        &self.controller
    }

    fn make_set_gcode(&self, heater: &str) -> Result<String, ValidationError> {
        self.controller
            .number_value(heater)
            .map(|target| gcode::set_heater(heater, target))
            .ok_or_else(|| bad_target("heater", heater))
    }

    /// Set one heater to its edited setpoint.
    pub fn set_heater(&self, heater: &str) {
        let action = "Set heater setpoint";
        match self.make_set_gcode(heater) {
            Ok(cmd) => {
                self.sequencer.send(action, cmd, None);
                self.controller.cancel(heater);
            }
            Err(err) => self.dialogs.show_error(action, &err.to_string(), None),
        }
    }

    /// Switch one heater off.
    pub fn heater_off(&self, heater: &str) {
        self.sequencer
            .send("Turn off heater", gcode::heater_off(heater), None);
        self.controller.cancel(heater);
    }

    /// Set every edited heater in one batch.
    pub fn set_all(&self) {
        let heater_names: Vec<String> = self.machine.read().heaters.keys().cloned().collect();
        let mut cmds = Vec::new();
        let mut edited = 0usize;
        let mut first_error: Option<ValidationError> = None;
        for name in &heater_names {
            if !self.controller.is_editing(name) {
                continue;
            }
            edited += 1;
            match self.make_set_gcode(name) {
                Ok(cmd) => cmds.push(cmd),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        let action = if edited > 1 {
            "Set heater setpoints"
        } else {
            "Set heater setpoint"
        };
        if let Some(err) = first_error {
            return self.dialogs.show_error(action, &err.to_string(), None);
        }
        if !cmds.is_empty() {
            self.sequencer.enqueue(action, cmds, None);
            self.controller.cancel_all();
        }
    }

    /// Display form of the measured temperature.
    pub fn display_actual(status: &HeaterStatus) -> String {
        format_precision(status.current, HEATER_PRECISION)
    }

    /// Display form of the setpoint; `off` for a disabled heater.
    pub fn display_target(status: &HeaterStatus) -> String {
        if status.is_off() {
            "off".to_string()
        } else {
            format_precision(status.target, HEATER_PRECISION)
        }
    }

    /// Live value offered for editing; empty for a disabled heater.
    pub fn edit_target(status: &HeaterStatus) -> String {
        if status.is_off() {
            String::new()
        } else {
            format_precision(status.target, HEATER_PRECISION)
        }
    }
}

/// Fans table: percent targets, off buttons, combined set.
pub struct FansPanel {
    controller: Arc<EditController>,
    sequencer: Arc<CommandSequencer>,
    dialogs: Arc<DialogQueue>,
    machine: ThreadSafeRw<MachineState>,
}

impl FansPanel {
    /// Create the fans panel.
    pub fn new(
        controller: Arc<EditController>,
        sequencer: Arc<CommandSequencer>,
        dialogs: Arc<DialogQueue>,
        machine: ThreadSafeRw<MachineState>,
    ) -> Self {
        Self {
            controller,
            sequencer,
            dialogs,
            machine,
        }
    }

    /// The group's edit controller.
    pub fn controller(&self) -> &Arc<EditController> {
        &self.controller
    }

    fn make_set_gcode(&self, fan: &str) -> Result<String, ValidationError> {
        self.controller
            .number_value(fan)
            .map(|percent| gcode::set_fan(fan, percent))
            .ok_or_else(|| bad_target("fan", fan))
    }

    /// Set one fan to its edited percent target.
    pub fn set_fan(&self, fan: &str) {
        let action = "Set fan target";
        match self.make_set_gcode(fan) {
            Ok(cmd) => {
                self.sequencer.send(action, cmd, None);
                self.controller.cancel(fan);
            }
            Err(err) => self.dialogs.show_error(action, &err.to_string(), None),
        }
    }

    /// Switch one fan off.
    pub fn fan_off(&self, fan: &str) {
        self.sequencer
            .send("Turn off fan", gcode::fan_off(fan), None);
        self.controller.cancel(fan);
    }

    /// Set every edited fan in one batch.
    pub fn set_all(&self) {
        let fan_names: Vec<String> = self.machine.read().fans.keys().cloned().collect();
        let mut cmds = Vec::new();
        let mut edited = 0usize;
        let mut first_error: Option<ValidationError> = None;
        for name in &fan_names {
            if !self.controller.is_editing(name) {
                continue;
            }
            edited += 1;
            match self.make_set_gcode(name) {
                Ok(cmd) => cmds.push(cmd),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        let action = if edited > 1 {
            "Set fan targets"
        } else {
            "Set fan target"
        };
        if let Some(err) = first_error {
            return self.dialogs.show_error(action, &err.to_string(), None);
        }
        if !cmds.is_empty() {
            self.sequencer.enqueue(action, cmds, None);
            self.controller.cancel_all();
        }
    }

    /// Live percent value offered for editing.
    pub fn edit_target(status: &FanStatus) -> String {
        format_precision(status.target * 100.0, FAN_PRECISION)
    }

    /// Display form of the percent target; `off` for a stopped fan.
    pub fn display_target(status: &FanStatus) -> String {
        if status.is_off() {
            "off".to_string()
        } else {
            Self::edit_target(status)
        }
    }
}

/// Speed-ratio table: a single pseudo-field.
pub struct SpeedPanel {
    controller: Arc<EditController>,
    sequencer: Arc<CommandSequencer>,
    dialogs: Arc<DialogQueue>,
    machine: ThreadSafeRw<MachineState>,
}

impl SpeedPanel {
    /// Create the speed panel.
    pub fn new(
        controller: Arc<EditController>,
        sequencer: Arc<CommandSequencer>,
        dialogs: Arc<DialogQueue>,
        machine: ThreadSafeRw<MachineState>,
    ) -> Self {
        Self {
            controller,
            sequencer,
            dialogs,
            machine,
        }
    }

    /// The group's edit controller.
    pub fn controller(&self) -> &Arc<EditController> {
        &self.controller
    }

    /// Set the speed ratio to the edited percent value.
    pub fn set_ratio(&self) {
        let action = "Set speed ratio";
        let Some(target) = self.controller.number_value(SPEED_FIELD_ID) else {
            return self.dialogs.show_error(
                action,
                &ValidationError::BadSpeedRatio.to_string(),
                None,
            );
        };
        self.sequencer
            .send(action, gcode::set_speed_ratio(target), None);
        self.controller.cancel(SPEED_FIELD_ID);
    }

    /// Reset the speed ratio to 100%.
    pub fn reset_ratio(&self) {
        self.sequencer
            .send("Reset speed ratio", gcode::reset_speed_ratio(), None);
        self.controller.cancel(SPEED_FIELD_ID);
    }

    /// Display form of the live ratio, in percent.
    pub fn display_ratio(&self) -> Option<String> {
        self.machine
            .read()
            .speed_ratio
            .map(|ratio| format_precision(ratio * 100.0, SPEED_PRECISION))
    }
}

/// Configuration table: typed option editing, apply, SD save/restore.
pub struct ConfigPanel {
    controller: Arc<EditController>,
    sequencer: Arc<CommandSequencer>,
    dialogs: Arc<DialogQueue>,
    options: ThreadSafeRw<BTreeMap<String, ConfigOption>>,
    refresh_config: Arc<dyn Fn() + Send + Sync>,
}

impl ConfigPanel {
    /// Create the config panel. `refresh_config` forces a config re-poll
    /// after commands that change the stored configuration.
    pub fn new(
        controller: Arc<EditController>,
        sequencer: Arc<CommandSequencer>,
        dialogs: Arc<DialogQueue>,
        options: ThreadSafeRw<BTreeMap<String, ConfigOption>>,
        refresh_config: Arc<dyn Fn() + Send + Sync>,
    ) -> Self {
        Self {
            controller,
            sequencer,
            dialogs,
            options,
            refresh_config,
        }
    }

    /// The group's edit controller.
    pub fn controller(&self) -> &Arc<EditController> {
        &self.controller
    }

    fn refresh_callback(&self) -> Option<CommandCallback> {
        let refresh = self.refresh_config.clone();
        Some(Box::new(move |_entry| refresh()))
    }

    fn option_kind(&self, name: &str) -> OptionKind {
        self.options
            .read()
            .get(name)
            .map(|option| option.kind)
            .unwrap_or(OptionKind::Text)
    }

    fn make_set_gcode(&self, name: &str) -> Result<String, ValidationError> {
        let value = self.controller.value(name).unwrap_or_default();
        let converted = self.option_kind(name).convert_for_set(&value)?;
        Ok(gcode::set_option(name, &converted))
    }

    /// Set one option to its edited value.
    pub fn set_option(&self, name: &str) {
        let action = "Set option";
        match self.make_set_gcode(name) {
            Ok(cmd) => {
                self.sequencer.send(action, cmd, self.refresh_callback());
                self.controller.cancel(name);
            }
            Err(err) => self.dialogs.show_error(action, &err.to_string(), None),
        }
    }

    /// Set every edited option in one batch.
    pub fn set_all(&self) {
        let option_names: Vec<String> = self.options.read().keys().cloned().collect();
        let mut cmds = Vec::new();
        let mut edited = 0usize;
        let mut first_error: Option<ValidationError> = None;
        for name in &option_names {
            if !self.controller.is_editing(name) {
                continue;
            }
            edited += 1;
            match self.make_set_gcode(name) {
                Ok(cmd) => cmds.push(cmd),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        let action = if edited > 1 { "Set options" } else { "Set option" };
        if let Some(err) = first_error {
            return self.dialogs.show_error(action, &err.to_string(), None);
        }
        if !cmds.is_empty() {
            self.sequencer.enqueue(action, cmds, self.refresh_callback());
            self.controller.cancel_all();
        }
    }

    /// Apply the staged configuration.
    pub fn apply(&self) {
        self.sequencer.send("Apply config", gcode::apply_config(), None);
    }

    /// Save the configuration to SD.
    pub fn save_to_sd(&self) {
        self.sequencer
            .send("Save config to SD", gcode::save_config(), None);
    }

    /// Restore the configuration from SD and re-poll it.
    pub fn restore_from_sd(&self) {
        self.sequencer.send(
            "Restore config from SD",
            gcode::restore_config(),
            self.refresh_callback(),
        );
    }
}

/// SD-card tab: mount controls, navigation, upload, file execution.
pub struct SdCardPanel {
    sequencer: Arc<CommandSequencer>,
    dialogs: Arc<DialogQueue>,
    dirlist: Arc<DirListController>,
    upload: Arc<FileUploadController>,
    machine: ThreadSafeRw<MachineState>,
}

impl SdCardPanel {
    /// Create the SD-card panel.
    pub fn new(
        sequencer: Arc<CommandSequencer>,
        dialogs: Arc<DialogQueue>,
        dirlist: Arc<DirListController>,
        upload: Arc<FileUploadController>,
        machine: ThreadSafeRw<MachineState>,
    ) -> Self {
        Self {
            sequencer,
            dialogs,
            dirlist,
            upload,
            machine,
        }
    }

    /// Mount the card.
    pub fn mount(&self) {
        self.sequencer.send("Mount SD-card", gcode::mount_sd(), None);
    }

    /// Unmount the card.
    pub fn unmount(&self) {
        self.sequencer
            .send("Unmount SD-card", gcode::unmount_sd(), None);
    }

    /// Mount or remount the card read-write.
    pub fn mount_rw(&self) {
        self.sequencer
            .send("Mount SD-card read-write", gcode::mount_sd_rw(), None);
    }

    /// Remount the card read-only.
    pub fn remount_ro(&self) {
        self.sequencer
            .send("Remount SD-card read-only", gcode::remount_sd_ro(), None);
    }

    /// Mount button enablement.
    pub fn can_mount(&self) -> bool {
        matches!(
            self.machine.read().sdcard,
            Some(card) if card.mnt_state == MountState::NotMounted
        )
    }

    /// Unmount button enablement.
    pub fn can_unmount(&self) -> bool {
        matches!(
            self.machine.read().sdcard,
            Some(card) if card.mnt_state == MountState::Mounted
        )
    }

    /// Mount-R/W button enablement.
    pub fn can_mount_rw(&self) -> bool {
        match self.machine.read().sdcard {
            Some(card) => {
                card.mnt_state == MountState::NotMounted
                    || (card.mnt_state == MountState::Mounted
                        && card.rw_state == RwState::ReadOnly)
            }
            None => false,
        }
    }

    /// Remount-R/O button enablement.
    pub fn can_remount_ro(&self) -> bool {
        matches!(
            self.machine.read().sdcard,
            Some(card) if card.mnt_state == MountState::Mounted
                && card.rw_state == RwState::ReadWrite
        )
    }

    /// Card state label for the tab header.
    pub fn state_text(&self) -> String {
        match self.machine.read().sdcard {
            Some(card) => card.describe().to_string(),
            None => "Disabled".to_string(),
        }
    }

    /// Navigate to an absolute directory; returns whether the input was
    /// accepted.
    pub fn navigate_to(&self, desired_dir: &str) -> bool {
        if !desired_dir.starts_with('/') {
            return false;
        }
        self.dirlist
            .request_dir(paths::remove_redundant_slashes(desired_dir));
        true
    }

    /// Navigate to the parent of the loaded directory.
    pub fn navigate_up(&self) {
        if self.dirlist.loaded_dir().is_none() {
            return;
        }
        if let Some(result) = self.dirlist.loaded_result() {
            if result.dir != "/" {
                self.navigate_to(&paths::parent_directory(&result.dir));
            }
        }
    }

    /// Request the first listing once the card shows up.
    pub fn ensure_initial_listing(&self, desired_dir: &str) {
        if self.machine.read().sdcard.is_some() && !self.dirlist.ever_requested() {
            self.navigate_to(desired_dir);
        }
    }

    /// Start an upload to a normalized destination path.
    pub fn start_upload(
        &self,
        source_file_name: &str,
        destination_path: &str,
        data: Vec<u8>,
    ) -> replink_core::Result<()> {
        self.upload.start_upload(
            source_file_name,
            paths::remove_redundant_slashes(destination_path),
            data,
        )
    }

    /// Consume a finished upload: refresh the listed directory when the
    /// uploaded file landed in it. Returns whether a result was consumed.
    pub fn handle_upload_result(&self) -> bool {
        if !self.upload.is_result_pending() {
            return false;
        }
        self.upload.ack_result();
        if let (Some(dest), Some(loaded)) =
            (self.upload.destination_path(), self.dirlist.loaded_dir())
        {
            if paths::path_is_in_directory(&dest, &loaded) {
                self.navigate_to(&loaded);
            }
        }
        true
    }

    /// Execute a file from the card, behind a confirmation dialog.
    pub fn execute_file(&self, file_path: &str) {
        let sequencer = self.sequencer.clone();
        let path = file_path.to_string();
        self.dialogs.show_confirm(
            "Confirm execution of file from SD-card",
            Some(file_path),
            "Cancel",
            "Execute",
            Box::new(move || {
                sequencer.send("Execute file", gcode::execute_file(&path), None);
            }),
        );
    }
}
