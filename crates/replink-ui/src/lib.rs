#![allow(dead_code)]
//! # Replink UI
//!
//! The UI-state layer of the dashboard, independent of any widget toolkit:
//! per-field-group edit controllers that reconcile pending user edits with
//! live machine data, per-table panels that turn edits into G-code, a
//! one-at-a-time dialog queue, and the application context that owns and
//! wires every component.

pub mod app;
pub mod dialog;
pub mod edit;
pub mod panels;

pub use app::{AppContext, AppTuning};

pub use dialog::{Dialog, DialogQueue};

pub use edit::{
    EditController, EditKeyAction, Key, PanelView, RenderInputs, RowRef, RowRefChildComponent,
    RowRefSameComponent,
};

pub use panels::{
    AxesPanel, ConfigPanel, FansPanel, HeatersPanel, SdCardPanel, SpeedPanel, DEFAULT_MOVE_SPEED,
    SD_ROOT_ACCESS_PREFIX, SPEED_FIELD_ID,
};
