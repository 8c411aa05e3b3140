//! # Replink Core
//!
//! Core types and utilities for Replink.
//! Provides the error taxonomy, the machine-state and configuration wire
//! models, G-code command builders, value formatting, and the UI event
//! dispatcher shared by the communication and UI crates.

pub mod error;
pub mod events;
pub mod format;
pub mod gcode;
pub mod machine;
pub mod options;
pub mod paths;
pub mod types;

pub use error::{Error, Result, TransportError, ValidationError};

pub use events::{EventDispatcher, UiEvent};

pub use format::{
    format_precision, remove_trailing_zeros, AXIS_PRECISION, CONFIG_PRECISION, FAN_PRECISION,
    HEATER_PRECISION, SPEED_PRECISION,
};

pub use gcode::{encode_str_for_cmd, response_has_error_marker};

pub use machine::{
    AxisStatus, DirEntry, DirListing, FanStatus, HeaterStatus, MachineState, MountState, RwState,
    SdCardState,
};

pub use options::{parse_options_list, ConfigOption, ConfigResponse, OptionKind, RawConfigOption};

// Re-export type aliases for convenience
pub use types::{Callback, DataCallback, ProgressCallback, ThreadSafe, ThreadSafeRw};
