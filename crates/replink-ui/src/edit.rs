//! Field editing state
//!
//! One [`EditController`] per logical field group (axes, heaters, fans,
//! speed, config options) tracks which fields hold a pending, unsubmitted
//! user-typed value. A field is either `Live` (no entry, display the
//! server-derived value) or `Editing` (entry present, display the pending
//! text); the transitions back to `Live` are cancel, successful submit, and
//! the field disappearing from the server-reported set.
//!
//! A live status update must never clobber a value the user is typing:
//! [`EditController::render_inputs`] prefers the pending value whenever an
//! entry exists, and [`EditController::reconcile`] runs against every fresh
//! snapshot before any render reads it.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Render-layer surface an edit controller talks to.
///
/// The real implementation wraps the rendered table; tests use fakes.
pub trait PanelView: Send + Sync {
    /// Raw text currently in the input addressed by `key`.
    fn input_value(&self, key: &str) -> Option<String>;

    /// Request a whole-table re-render.
    fn refresh(&self);

    /// Per-row child component, for child-component row lookup.
    fn child(&self, id: &str) -> Option<Arc<dyn PanelView>> {
        let _ = id;
        None
    }
}

/// Strategy for resolving a row's input and re-rendering a row.
pub trait RowRef: Send + Sync {
    /// Raw input text of the row for `id`.
    fn row_input(&self, panel: &dyn PanelView, id: &str) -> Option<String>;

    /// Request a re-render of the row for `id`.
    fn refresh_row(&self, panel: &dyn PanelView, id: &str);
}

/// Rows live in the group's own component; inputs are addressed by a
/// ref prefix plus the field id, and row refresh refreshes the table.
pub struct RowRefSameComponent {
    prefix: String,
}

impl RowRefSameComponent {
    /// Create a strategy with the given input ref prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl RowRef for RowRefSameComponent {
    fn row_input(&self, panel: &dyn PanelView, id: &str) -> Option<String> {
        panel.input_value(&format!("{}{}", self.prefix, id))
    }

    fn refresh_row(&self, panel: &dyn PanelView, _id: &str) {
        panel.refresh();
    }
}

/// Rows are child components keyed by field id; inputs are addressed by a
/// fixed ref inside the child, and row refresh refreshes just the child.
pub struct RowRefChildComponent {
    child_key: String,
}

impl RowRefChildComponent {
    /// Create a strategy with the given child input ref.
    pub fn new(child_key: impl Into<String>) -> Self {
        Self {
            child_key: child_key.into(),
        }
    }
}

impl RowRef for RowRefChildComponent {
    fn row_input(&self, panel: &dyn PanelView, id: &str) -> Option<String> {
        panel.child(id)?.input_value(&self.child_key)
    }

    fn refresh_row(&self, panel: &dyn PanelView, id: &str) {
        if let Some(child) = panel.child(id) {
            child.refresh();
        }
    }
}

/// Keys the edit controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Attempt submission; no state transition is forced
    Enter,
    /// Cancel the edit
    Escape,
}

/// What the render layer should do after a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKeyAction {
    /// Nothing further
    None,
    /// Invoke the owning panel's submit action for the field
    Submit,
}

struct EditState {
    editing: BTreeMap<String, String>,
    dirty_all_rows: bool,
    dirty_rows: BTreeSet<String>,
}

/// Editing-state controller for one field group.
pub struct EditController {
    comp: Mutex<Option<Arc<dyn PanelView>>>,
    row_ref: Box<dyn RowRef>,
    state: Mutex<EditState>,
}

impl EditController {
    /// Create a controller with a row-reference strategy.
    pub fn new(row_ref: impl RowRef + 'static) -> Arc<Self> {
        Arc::new(Self {
            comp: Mutex::new(None),
            row_ref: Box::new(row_ref),
            state: Mutex::new(EditState {
                editing: BTreeMap::new(),
                dirty_all_rows: false,
                dirty_rows: BTreeSet::new(),
            }),
        })
    }

    /// Attach the rendered component.
    pub fn set_component(&self, comp: Arc<dyn PanelView>) {
        *self.comp.lock() = Some(comp);
    }

    fn component(&self) -> Option<Arc<dyn PanelView>> {
        self.comp.lock().clone()
    }

    /// Current raw text for `id`: the pending edit if one exists, the
    /// rendered input otherwise.
    pub fn value(&self, id: &str) -> Option<String> {
        if let Some(pending) = self.state.lock().editing.get(id) {
            return Some(pending.clone());
        }
        let comp = self.component()?;
        self.row_ref.row_input(comp.as_ref(), id)
    }

    /// Current value for `id` parsed as a number; `None` is a validation
    /// failure and must not produce a command.
    pub fn number_value(&self, id: &str) -> Option<f64> {
        let text = self.value(id)?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        text.parse().ok()
    }

    /// Whether `id` has a pending unsubmitted value.
    pub fn is_editing(&self, id: &str) -> bool {
        self.state.lock().editing.contains_key(id)
    }

    /// Whether any field in the group is being edited; drives the
    /// enablement of combined "apply to all edited rows" actions.
    pub fn is_editing_any(&self) -> bool {
        !self.state.lock().editing.is_empty()
    }

    /// Whether the row for `id` must be re-rendered.
    pub fn row_is_dirty(&self, id: &str) -> bool {
        let state = self.state.lock();
        state.dirty_all_rows || state.dirty_rows.contains(id)
    }

    /// Record a keystroke: store the current raw input text as the pending
    /// value for `id`.
    pub fn on_change(&self, id: &str) {
        let Some(comp) = self.component() else {
            return;
        };
        let Some(value) = self.row_ref.row_input(comp.as_ref(), id) else {
            return;
        };
        let was_editing_any = {
            let mut state = self.state.lock();
            let was_editing_any = !state.editing.is_empty();
            state.editing.insert(id.to_string(), value);
            state.dirty_rows.insert(id.to_string());
            was_editing_any
        };
        if was_editing_any {
            self.row_ref.refresh_row(comp.as_ref(), id);
        } else {
            // The combined "set" button may need to change to enabled.
            comp.refresh();
        }
    }

    /// Handle a key event on the input for `id`.
    pub fn handle_key(&self, id: &str, key: Key) -> EditKeyAction {
        match key {
            Key::Escape => {
                self.cancel(id);
                EditKeyAction::None
            }
            Key::Enter => EditKeyAction::Submit,
        }
    }

    /// Drop the pending value for `id`, if any. No-op otherwise.
    pub fn cancel(&self, id: &str) {
        let Some(still_editing_any) = ({
            let mut state = self.state.lock();
            if state.editing.remove(id).is_none() {
                None
            } else {
                state.dirty_rows.insert(id.to_string());
                Some(!state.editing.is_empty())
            }
        }) else {
            return;
        };
        let Some(comp) = self.component() else {
            return;
        };
        if still_editing_any {
            self.row_ref.refresh_row(comp.as_ref(), id);
        } else {
            // The combined "set" button may need to change to disabled.
            comp.refresh();
        }
    }

    /// Drop every pending value; used after a batched submission succeeds.
    pub fn cancel_all(&self) {
        {
            let mut state = self.state.lock();
            let ids: Vec<String> = state.editing.keys().cloned().collect();
            for id in ids {
                state.dirty_rows.insert(id);
            }
            state.editing.clear();
        }
        if let Some(comp) = self.component() {
            comp.refresh();
        }
    }

    /// Drop pending values for fields absent from the server's current
    /// field set. Runs at the start of every render pass, before any render
    /// reads the new snapshot.
    pub fn reconcile<'a, I>(&self, current_ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let current: BTreeSet<&str> = current_ids.into_iter().collect();
        let mut state = self.state.lock();
        state.editing.retain(|id, _| current.contains(id.as_str()));
    }

    /// Inputs for rendering the row for `id`.
    pub fn render_inputs(&self, id: &str, live_value: &str) -> RenderInputs<'_> {
        let pending = self.state.lock().editing.get(id).cloned();
        let editing = pending.is_some();
        RenderInputs {
            controller: self,
            id: id.to_string(),
            editing,
            value: pending.unwrap_or_else(|| live_value.to_string()),
        }
    }

    /// Mark every row stale.
    pub fn mark_dirty_all_rows(&self) {
        self.state.lock().dirty_all_rows = true;
    }

    /// Mark one row stale.
    pub fn mark_dirty_row(&self, id: &str) {
        self.state.lock().dirty_rows.insert(id.to_string());
    }

    /// Mark every row stale and request a table re-render.
    pub fn force_refresh(&self) {
        self.mark_dirty_all_rows();
        if let Some(comp) = self.component() {
            comp.refresh();
        }
    }

    /// Clear dirty tracking after a full render commit.
    pub fn commit_render(&self) {
        let mut state = self.state.lock();
        state.dirty_all_rows = false;
        state.dirty_rows.clear();
    }

    /// Clear dirty tracking for one row after a row render commit.
    pub fn commit_row_render(&self, id: &str) {
        self.state.lock().dirty_rows.remove(id);
    }
}

/// Per-row render inputs with handlers bound to the row's field id.
pub struct RenderInputs<'a> {
    controller: &'a EditController,
    id: String,
    /// Whether the field is being edited
    pub editing: bool,
    /// Text to display: the pending value while editing, the live value
    /// otherwise
    pub value: String,
}

impl RenderInputs<'_> {
    /// Cancel handler
    pub fn cancel(&self) {
        self.controller.cancel(&self.id);
    }

    /// Change handler
    pub fn change(&self) {
        self.controller.on_change(&self.id);
    }

    /// Key handler
    pub fn key(&self, key: Key) -> EditKeyAction {
        self.controller.handle_key(&self.id, key)
    }
}
