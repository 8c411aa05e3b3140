//! # Replink
//!
//! The machine-facing core of a web dashboard for RepRap-style 3D-printer
//! firmware speaking the `rr_*` HTTP protocol:
//! - Strict one-at-a-time G-code command sequencing with bounded history
//! - Machine status and configuration polling with liveness conditions
//! - Per-field-group editing-state reconciliation (live values vs pending
//!   user edits)
//! - SD-card directory listing and file upload controllers
//!
//! ## Architecture
//!
//! Replink is organized as a workspace with multiple crates:
//!
//! 1. **replink-core** - Types, errors, machine-state model, command builders
//! 2. **replink-communication** - HTTP transport, sequencer, status updaters
//! 3. **replink-ui** - Edit controllers, panels, dialogs, app context
//! 4. **replink** - This facade crate, re-exporting the public surface

#![allow(dead_code)]

pub use replink_core::{
    encode_str_for_cmd, format_precision, remove_trailing_zeros, response_has_error_marker,
    AxisStatus, ConfigOption, DirEntry, DirListing, Error, EventDispatcher, FanStatus,
    HeaterStatus, MachineState, MountState, OptionKind, Result, RwState, SdCardState,
    TransportError, UiEvent, ValidationError,
};

pub use replink_communication::{
    CommandCallback, CommandEntry, CommandSequencer, Condition, ConfigSource, DirListController,
    DirListHooks, FileUploadController, GcodeReply, HttpTransport, MachineStatusSource,
    NoOpTransport, SequencerHooks, StatusSource, StatusUpdater, Transport, UpdaterTuning,
    UploadHooks, GCODE_HISTORY_SIZE,
};

pub use replink_ui::{
    AppContext, AppTuning, AxesPanel, ConfigPanel, Dialog, DialogQueue, EditController,
    EditKeyAction, FansPanel, HeatersPanel, Key, PanelView, RenderInputs, RowRef,
    RowRefChildComponent, RowRefSameComponent, SdCardPanel, SpeedPanel, SPEED_FIELD_ID,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
