//! Modal dialog queue
//!
//! Dialogs are queued one at a time in order of occurrence, never stacked.
//! The render layer shows [`DialogQueue::current`], and calls
//! [`DialogQueue::dismiss`] or [`DialogQueue::confirm`] when the user closes
//! the modal; either advances to the next queued dialog.

use parking_lot::Mutex;
use replink_core::Callback;
use std::collections::VecDeque;
use std::sync::Arc;

/// A dialog to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    /// Error report with a close button
    Error {
        /// Headline, including the failed action's label
        label: String,
        /// Optional detail text, e.g. the device's error output
        body: Option<String>,
    },
    /// Confirmation with cancel/confirm buttons
    Confirm {
        /// Headline
        label: String,
        /// Optional detail text
        body: Option<String>,
        /// Cancel button label
        cancel_text: String,
        /// Confirm button label
        confirm_text: String,
    },
}

struct QueuedDialog {
    dialog: Dialog,
    confirm_action: Option<Box<dyn FnOnce() + Send>>,
}

struct DialogState {
    current: Option<QueuedDialog>,
    queue: VecDeque<QueuedDialog>,
}

/// One-at-a-time dialog queue.
pub struct DialogQueue {
    on_changed: Callback,
    state: Mutex<DialogState>,
}

impl DialogQueue {
    /// Create an empty queue; `on_changed` drives re-render.
    pub fn new(on_changed: Callback) -> Arc<Self> {
        Arc::new(Self {
            on_changed,
            state: Mutex::new(DialogState {
                current: None,
                queue: VecDeque::new(),
            }),
        })
    }

    /// Queue an error dialog for a failed action.
    pub fn show_error(&self, action: &str, head: &str, body: Option<&str>) {
        tracing::error!(
            "Error in {}. {}{}",
            action,
            head,
            body.map(|text| format!("\n{text}")).unwrap_or_default()
        );
        let label = format!("Error in \"{action}\".\n{head}");
        self.push(QueuedDialog {
            dialog: Dialog::Error {
                label,
                body: body.map(String::from),
            },
            confirm_action: None,
        });
    }

    /// Queue a confirmation dialog; `confirm_action` runs if confirmed.
    pub fn show_confirm(
        &self,
        label: impl Into<String>,
        body: Option<&str>,
        cancel_text: impl Into<String>,
        confirm_text: impl Into<String>,
        confirm_action: Box<dyn FnOnce() + Send>,
    ) {
        self.push(QueuedDialog {
            dialog: Dialog::Confirm {
                label: label.into(),
                body: body.map(String::from),
                cancel_text: cancel_text.into(),
                confirm_text: confirm_text.into(),
            },
            confirm_action: Some(confirm_action),
        });
    }

    fn push(&self, dialog: QueuedDialog) {
        {
            let mut state = self.state.lock();
            if state.current.is_none() {
                state.current = Some(dialog);
            } else {
                state.queue.push_back(dialog);
            }
        }
        (self.on_changed)();
    }

    /// The dialog to display, if any.
    pub fn current(&self) -> Option<Dialog> {
        self.state.lock().current.as_ref().map(|queued| queued.dialog.clone())
    }

    /// Number of dialogs waiting behind the current one.
    pub fn queued_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Close the current dialog without confirming; shows the next one.
    pub fn dismiss(&self) {
        {
            let mut state = self.state.lock();
            if state.current.is_none() {
                return;
            }
            state.current = state.queue.pop_front();
        }
        (self.on_changed)();
    }

    /// Confirm the current dialog: close it, show the next one, then run
    /// the confirm action (if the dialog carried one).
    pub fn confirm(&self) {
        let action = {
            let mut state = self.state.lock();
            let Some(current) = state.current.take() else {
                return;
            };
            state.current = state.queue.pop_front();
            current.confirm_action
        };
        (self.on_changed)();
        if let Some(action) = action {
            action();
        }
    }
}
