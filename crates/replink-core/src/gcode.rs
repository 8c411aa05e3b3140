//! G-code command builders
//!
//! Every dashboard action maps to one of the firmware's command
//! conventions. Builders return single command lines; batching multiple
//! lines into one request is the sequencer's job.

use crate::format::{format_precision, FAN_PRECISION, SPEED_PRECISION};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Byte set escaped in command string values.
///
/// Matches URI component encoding: alphanumerics and `-_.!~*'()` pass
/// through, everything else becomes a `%XX` escape. Forward slashes are
/// exempted because the firmware accepts them literally in paths.
const CMD_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'/');

/// Escape a string value for embedding in a command.
///
/// The firmware's unescape uses `\` where URIs use `%`.
pub fn encode_str_for_cmd(val: &str) -> String {
    utf8_percent_encode(val, CMD_ESCAPE_SET)
        .to_string()
        .replace('%', "\\")
}

/// Whether a raw command response signals a device-level failure.
///
/// The firmware's convention is a response line beginning `Error:`, even on
/// HTTP success.
pub fn response_has_error_marker(response: &str) -> bool {
    response.lines().any(|line| line.starts_with("Error:"))
}

/// `G0` move with explicit feed rate; one `<AXIS><target>` word per axis.
pub fn move_axes(speed_per_min: f64, targets: &[(&str, f64)]) -> String {
    let mut cmd = format!("G0 R F{speed_per_min}");
    for (axis, target) in targets {
        cmd.push(' ');
        cmd.push_str(axis);
        cmd.push_str(&target.to_string());
    }
    cmd
}

/// Home all axes
pub fn home_axes() -> String {
    "G28".to_string()
}

/// Probe the bed
pub fn probe_bed() -> String {
    "G32".to_string()
}

/// Disable steppers
pub fn motors_off() -> String {
    "M18".to_string()
}

/// Set a heater setpoint
pub fn set_heater(heater: &str, target: f64) -> String {
    format!("M104 F {heater} S{target}")
}

/// Switch a heater off
pub fn heater_off(heater: &str) -> String {
    format!("M104 F {heater} Snan")
}

/// Set a fan target, entered as percent, sent as 0-255 PWM
pub fn set_fan(fan: &str, percent: f64) -> String {
    let pwm = format_precision(percent / 100.0 * 255.0, FAN_PRECISION + 3);
    format!("M106 F {fan} S{pwm}")
}

/// Switch a fan off
pub fn fan_off(fan: &str) -> String {
    format!("M106 F {fan} S0")
}

/// Set the speed ratio, in percent
pub fn set_speed_ratio(percent: f64) -> String {
    format!("M220 S{}", format_precision(percent, SPEED_PRECISION + 3))
}

/// Reset the speed ratio to 100%
pub fn reset_speed_ratio() -> String {
    "M220 S100".to_string()
}

/// Set a configuration option to an escaped value
pub fn set_option(name: &str, value: &str) -> String {
    format!("M926 I{name} V{}", encode_str_for_cmd(value))
}

/// Apply the staged configuration
pub fn apply_config() -> String {
    "M930".to_string()
}

/// Save the configuration to SD
pub fn save_config() -> String {
    "M500".to_string()
}

/// Restore the configuration from SD
pub fn restore_config() -> String {
    "M501".to_string()
}

/// Mount the SD card
pub fn mount_sd() -> String {
    "M21".to_string()
}

/// Unmount the SD card
pub fn unmount_sd() -> String {
    "M22".to_string()
}

/// Mount or remount the SD card read-write
pub fn mount_sd_rw() -> String {
    "M21 W".to_string()
}

/// Remount the SD card read-only
pub fn remount_sd_ro() -> String {
    "M22 R".to_string()
}

/// Execute a file from the SD card
pub fn execute_file(path: &str) -> String {
    format!("M32 F{}", encode_str_for_cmd(path))
}
