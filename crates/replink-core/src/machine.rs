//! Machine state wire model
//!
//! Deserialized payloads of the `rr_status` and `rr_files` endpoints. The
//! status object carries dynamic key sets (axes, heaters, fans keyed by
//! whatever names the firmware is configured with); those are ordered maps
//! so that iteration order is stable between polls and a key may appear or
//! disappear at any poll without disturbing its neighbours.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Status of one axis
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisStatus {
    /// Planned position
    pub pos: f64,
}

/// Status of one heater
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HeaterStatus {
    /// Measured temperature
    pub current: f64,
    /// Setpoint; negative infinity means the heater is off
    #[serde(deserialize_with = "deserialize_setpoint")]
    pub target: f64,
    /// Device-reported heater fault
    #[serde(default)]
    pub error: bool,
}

impl HeaterStatus {
    /// Whether the heater is switched off (no setpoint)
    pub fn is_off(&self) -> bool {
        self.target == f64::NEG_INFINITY
    }
}

/// Status of one fan
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FanStatus {
    /// Target duty cycle in `[0, 1]`
    pub target: f64,
}

impl FanStatus {
    /// Whether the fan is switched off
    pub fn is_off(&self) -> bool {
        self.target == 0.0
    }
}

/// SD-card mount state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MountState {
    /// No card mounted
    NotMounted,
    /// Mount in progress
    Mounting,
    /// Card mounted
    Mounted,
    /// State string not recognized
    Unknown,
}

impl From<String> for MountState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NotMounted" => MountState::NotMounted,
            "Mounting" => MountState::Mounting,
            "Mounted" => MountState::Mounted,
            other => {
                tracing::warn!("Unknown SD-card mount state '{}'", other);
                MountState::Unknown
            }
        }
    }
}

impl MountState {
    /// Human-readable label
    pub fn describe(&self) -> &'static str {
        match self {
            MountState::NotMounted => "Not mounted",
            MountState::Mounting => "Mounting",
            MountState::Mounted => "Mounted",
            MountState::Unknown => "Unknown",
        }
    }
}

/// SD-card read/write state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RwState {
    /// Mounted read-only
    ReadOnly,
    /// Read-write remount in progress
    MountingRw,
    /// Mounted read-write
    ReadWrite,
    /// Read-only remount in progress
    RemountingRo,
    /// State string not recognized
    Unknown,
}

impl From<String> for RwState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ReadOnly" => RwState::ReadOnly,
            "MountingRW" => RwState::MountingRw,
            "ReadWrite" => RwState::ReadWrite,
            "RemountingRO" => RwState::RemountingRo,
            other => {
                tracing::warn!("Unknown SD-card rw state '{}'", other);
                RwState::Unknown
            }
        }
    }
}

impl RwState {
    /// Human-readable label
    pub fn describe(&self) -> &'static str {
        match self {
            RwState::ReadOnly => "Mounted R/O",
            RwState::MountingRw => "Mounting R/W",
            RwState::ReadWrite => "Mounted R/W",
            RwState::RemountingRo => "Remounting R/O",
            RwState::Unknown => "Unknown",
        }
    }
}

/// SD-card status block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SdCardState {
    /// Mount state
    #[serde(rename = "mntState")]
    pub mnt_state: MountState,
    /// Read/write state, meaningful while mounted
    #[serde(rename = "rwState", default = "default_rw_state")]
    pub rw_state: RwState,
}

fn default_rw_state() -> RwState {
    RwState::ReadOnly
}

impl SdCardState {
    /// Label shown in the SD-card panel header
    pub fn describe(&self) -> &'static str {
        if self.mnt_state == MountState::Mounted {
            self.rw_state.describe()
        } else {
            self.mnt_state.describe()
        }
    }
}

/// Full machine status snapshot (`rr_status` payload)
///
/// Replaced wholesale on every successful poll, never patched field by
/// field. Absent keys deserialize to `None`/empty so that firmware builds
/// with fewer modules still produce a usable snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MachineState {
    /// Whether the machine is executing something
    pub active: Option<bool>,
    /// Speed ratio (1.0 = 100%)
    #[serde(rename = "speedRatio")]
    pub speed_ratio: Option<f64>,
    /// Whether the running configuration differs from the applied one
    #[serde(rename = "configDirty")]
    pub config_dirty: Option<bool>,
    /// SD-card status, absent when the firmware has no SD module
    pub sdcard: Option<SdCardState>,
    /// Bed-probe block; presence alone signals the feature
    #[serde(rename = "bedProbe")]
    bed_probe: Option<serde_json::Value>,
    /// Axes by name
    pub axes: BTreeMap<String, AxisStatus>,
    /// Heaters by name
    pub heaters: BTreeMap<String, HeaterStatus>,
    /// Fans by name
    pub fans: BTreeMap<String, FanStatus>,
}

impl MachineState {
    /// Whether the firmware reports a bed probe
    pub fn has_bed_probe(&self) -> bool {
        self.bed_probe.is_some()
    }
}

/// Directory listing (`rr_files` payload)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DirListing {
    /// The listed directory
    pub dir: String,
    /// Raw entries; a leading `*` marks a directory
    pub files: Vec<String>,
}

/// One classified directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name without the directory flag
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl DirListing {
    /// Entries sorted by raw name, with the `*` directory flag decoded
    pub fn entries(&self) -> Vec<DirEntry> {
        let mut files = self.files.clone();
        files.sort();
        files
            .into_iter()
            .map(|file| match file.strip_prefix('*') {
                Some(name) => DirEntry {
                    name: name.to_string(),
                    is_dir: true,
                },
                None => DirEntry {
                    name: file,
                    is_dir: false,
                },
            })
            .collect()
    }
}

/// Deserialize a heater setpoint.
///
/// The firmware encodes infinite setpoints as `1e1024`/`-1e1024`, which are
/// outside f64 range; going through `serde_json::Number` (with arbitrary
/// precision enabled) lets the conversion saturate to infinity instead of
/// rejecting the whole status document.
fn deserialize_setpoint<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .to_string()
        .parse::<f64>()
        .map_err(|_| serde::de::Error::custom("setpoint is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_with_all_blocks() {
        let json = r#"{
            "active": true,
            "speedRatio": 1.0,
            "configDirty": false,
            "sdcard": {"mntState": "Mounted", "rwState": "ReadOnly"},
            "bedProbe": {},
            "axes": {"X": {"pos": 1.5}, "Y": {"pos": -2.0}},
            "heaters": {"B": {"current": 21.4, "target": -1e1024, "error": false}},
            "fans": {"F": {"target": 0.5}}
        }"#;
        let state: MachineState = serde_json::from_str(json).unwrap();
        assert_eq!(state.active, Some(true));
        assert!(state.has_bed_probe());
        assert_eq!(state.axes["X"].pos, 1.5);
        assert!(state.heaters["B"].is_off());
        assert!(!state.fans["F"].is_off());
        assert_eq!(state.sdcard.unwrap().describe(), "Mounted R/O");
    }

    #[test]
    fn status_with_minimal_payload() {
        let state: MachineState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.active, None);
        assert_eq!(state.speed_ratio, None);
        assert!(state.axes.is_empty());
        assert!(!state.has_bed_probe());
    }

    #[test]
    fn heater_target_finite() {
        let json = r#"{"heaters": {"T": {"current": 180.0, "target": 210.0, "error": true}}}"#;
        let state: MachineState = serde_json::from_str(json).unwrap();
        let heater = &state.heaters["T"];
        assert!(!heater.is_off());
        assert_eq!(heater.target, 210.0);
        assert!(heater.error);
    }

    #[test]
    fn axes_iterate_in_name_order() {
        let json = r#"{"axes": {"Z": {"pos": 0.0}, "X": {"pos": 0.0}, "Y": {"pos": 0.0}}}"#;
        let state: MachineState = serde_json::from_str(json).unwrap();
        let names: Vec<_> = state.axes.keys().cloned().collect();
        assert_eq!(names, ["X", "Y", "Z"]);
    }

    #[test]
    fn unmounted_card_describe() {
        let card: SdCardState =
            serde_json::from_str(r#"{"mntState": "NotMounted", "rwState": "ReadOnly"}"#).unwrap();
        assert_eq!(card.describe(), "Not mounted");
    }

    #[test]
    fn dir_listing_entries() {
        let listing = DirListing {
            dir: "/gcodes".to_string(),
            files: vec!["part.gcode".into(), "*sub".into(), "a.gcode".into()],
        };
        let entries = listing.entries();
        assert_eq!(entries[0].name, "sub");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "a.gcode");
        assert!(!entries[1].is_dir);
        assert_eq!(entries[2].name, "part.gcode");
    }
}
