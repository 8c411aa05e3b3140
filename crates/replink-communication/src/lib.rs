#![allow(dead_code)]
//! # Replink Communication
//!
//! Machine-facing plumbing for Replink: the HTTP transport over the `rr_*`
//! endpoint family, the strict one-at-a-time G-code command sequencer, the
//! debounced status/config pollers, and the SD-card directory-listing and
//! file-upload controllers.
//!
//! Each component guarantees at most one request in flight on its own
//! channel; a second request issued while one is outstanding coalesces into
//! "do one more after this" instead of running concurrently.

pub mod dirlist;
pub mod sequencer;
pub mod transport;
pub mod updater;
pub mod upload;

pub use transport::{GcodeReply, HttpTransport, NoOpTransport, Transport};

pub use sequencer::{
    CommandCallback, CommandEntry, CommandSequencer, SequencerHooks, GCODE_HISTORY_SIZE,
};

pub use updater::{
    Condition, ConfigSource, MachineStatusSource, StatusSource, StatusUpdater, UpdaterTuning,
};

pub use dirlist::{DirListController, DirListHooks};

pub use upload::{FileUploadController, UploadHooks};
