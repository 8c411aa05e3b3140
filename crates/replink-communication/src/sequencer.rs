//! G-code command sequencing
//!
//! All outgoing commands funnel through one [`CommandSequencer`], which
//! serializes them into a strict FIFO channel: at most one entry is in
//! flight, transmission order equals enqueue order, and completed entries
//! move to a bounded history ring. Failures never halt the queue; the next
//! entry starts immediately.

use crate::transport::{GcodeReply, Transport};
use parking_lot::Mutex;
use replink_core::{response_has_error_marker, Callback, TransportError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default bound on queue + history length
pub const GCODE_HISTORY_SIZE: usize = 20;

/// Ids wrap back to 1 after reaching this value
const ID_WRAP_LIMIT: u64 = 1_000_000;

/// Delay before a transmitted command nudges the status poller, so the
/// activity indicator catches up even while the command is still running
const STATUS_NUDGE_DELAY: Duration = Duration::from_millis(200);

/// Completion callback, invoked exactly once with the finalized entry
pub type CommandCallback = Box<dyn FnOnce(&CommandEntry) + Send>;

/// One queued or historical command
#[derive(Debug, Clone)]
pub struct CommandEntry {
    /// Sequence number; wraps, never zero
    pub id: u64,
    /// Label of the user action that produced the entry
    pub reason: String,
    /// Command lines sent as one request
    pub command_lines: Vec<String>,
    /// False while queued or in flight
    pub completed: bool,
    /// Transport/status failure description, `None` on success
    pub error: Option<String>,
    /// Raw response text, possibly partial while in flight
    pub response: String,
    /// Whether the entry failed, either by `error` or by response marker
    pub is_error: bool,
    /// Redraw flag consumed by the render pass
    pub dirty: bool,
}

impl CommandEntry {
    fn new(id: u64, reason: String, command_lines: Vec<String>) -> Self {
        Self {
            id,
            reason,
            command_lines,
            completed: false,
            error: None,
            response: String::new(),
            is_error: false,
            dirty: true,
        }
    }

    /// One-line display form of the command batch
    pub fn display_command(&self) -> String {
        self.command_lines.join("; ")
    }

    /// Request body: newline-joined, newline-terminated
    pub fn request_body(&self) -> String {
        let mut body = self.command_lines.join("\n");
        body.push('\n');
        body
    }

    /// Result text for display: the trimmed response, annotated with
    /// `(pending)` while in flight or the transport error on failure.
    pub fn result_text(&self) -> String {
        let mut result = self.response.trim().to_string();
        let extra = if !self.completed {
            Some("(pending)".to_string())
        } else {
            self.error.as_ref().map(|err| format!("Error: {err}"))
        };
        if let Some(extra) = extra {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&extra);
        }
        result
    }
}

/// Hooks the sequencer fires as entries progress.
pub struct SequencerHooks {
    /// Queue or history content changed; drives re-render
    pub on_changed: Callback,
    /// A status refresh should happen soon (non-blocking hint)
    pub request_status_refresh: Callback,
    /// A completed entry carries an error; drives the error dialog
    pub on_command_error: Box<dyn Fn(&CommandEntry) + Send + Sync>,
}

impl Default for SequencerHooks {
    fn default() -> Self {
        Self {
            on_changed: Box::new(|| {}),
            request_status_refresh: Box::new(|| {}),
            on_command_error: Box::new(|_| {}),
        }
    }
}

struct QueuedCommand {
    entry: CommandEntry,
    callback: Option<CommandCallback>,
}

struct SequencerInner {
    queue: VecDeque<QueuedCommand>,
    history: VecDeque<CommandEntry>,
    next_id: u64,
    history_size: usize,
}

impl SequencerInner {
    /// Evict oldest history entries while the combined length exceeds the
    /// cap. Live queue entries are never evicted.
    fn enforce_cap(&mut self) {
        while self.queue.len() + self.history.len() > self.history_size
            && !self.history.is_empty()
        {
            self.history.pop_front();
        }
    }
}

/// FIFO command channel to the machine.
pub struct CommandSequencer {
    transport: Arc<dyn Transport>,
    inner: Mutex<SequencerInner>,
    hooks: SequencerHooks,
    nudge_timer: Mutex<Option<JoinHandle<()>>>,
}

impl CommandSequencer {
    /// Create a sequencer with the default history bound.
    pub fn new(transport: Arc<dyn Transport>, hooks: SequencerHooks) -> Arc<Self> {
        Self::with_history_size(transport, hooks, GCODE_HISTORY_SIZE)
    }

    /// Create a sequencer with an explicit history bound.
    pub fn with_history_size(
        transport: Arc<dyn Transport>,
        hooks: SequencerHooks,
        history_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            inner: Mutex::new(SequencerInner {
                queue: VecDeque::new(),
                history: VecDeque::new(),
                next_id: 1,
                history_size,
            }),
            hooks,
            nudge_timer: Mutex::new(None),
        })
    }

    /// Enqueue a single command line.
    pub fn send(
        self: &Arc<Self>,
        reason: impl Into<String>,
        command: impl Into<String>,
        callback: Option<CommandCallback>,
    ) {
        self.enqueue(reason, vec![command.into()], callback);
    }

    /// Enqueue a command batch.
    ///
    /// If the queue was empty, transmission begins immediately; otherwise
    /// the entry waits behind prior entries. Completion is observed via
    /// `callback` and the queue/history snapshots.
    pub fn enqueue(
        self: &Arc<Self>,
        reason: impl Into<String>,
        command_lines: Vec<String>,
        callback: Option<CommandCallback>,
    ) {
        let start = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id = if inner.next_id >= ID_WRAP_LIMIT {
                1
            } else {
                inner.next_id + 1
            };
            let entry = CommandEntry::new(id, reason.into(), command_lines);
            tracing::debug!("Enqueued command #{}: {}", id, entry.display_command());
            inner.queue.push_back(QueuedCommand {
                entry,
                callback,
            });
            inner.enforce_cap();
            inner.queue.len() == 1
        };
        if start {
            self.transmit_head();
        }
        (self.hooks.on_changed)();
    }

    /// Snapshot of the live queue, head first.
    pub fn queue_snapshot(&self) -> Vec<CommandEntry> {
        self.inner
            .lock()
            .queue
            .iter()
            .map(|queued| queued.entry.clone())
            .collect()
    }

    /// Snapshot of the completed history, oldest first.
    pub fn history_snapshot(&self) -> Vec<CommandEntry> {
        self.inner.lock().history.iter().cloned().collect()
    }

    /// Reason label of the in-flight entry, for the "Executing:" indicator.
    pub fn executing_reason(&self) -> Option<String> {
        self.inner
            .lock()
            .queue
            .front()
            .map(|queued| queued.entry.reason.clone())
    }

    /// Clear redraw flags after a render commit.
    pub fn clear_dirty(&self) {
        let mut inner = self.inner.lock();
        for queued in inner.queue.iter_mut() {
            queued.entry.dirty = false;
        }
        for entry in inner.history.iter_mut() {
            entry.dirty = false;
        }
    }

    /// Begin transmitting the queue head.
    fn transmit_head(self: &Arc<Self>) {
        let (id, body) = {
            let inner = self.inner.lock();
            let Some(head) = inner.queue.front() else {
                return;
            };
            (head.entry.id, head.entry.request_body())
        };

        self.start_status_nudge();

        let sequencer = self.clone();
        tokio::spawn(async move {
            let progress_target = sequencer.clone();
            let progress = move |text: &str| progress_target.record_progress(id, text);
            let result = sequencer.transport.send_gcode(body, &progress).await;
            sequencer.complete_head(id, result);
        });
    }

    /// Record partial response text on the in-flight entry.
    fn record_progress(&self, id: u64, text: &str) {
        {
            let mut inner = self.inner.lock();
            match inner.queue.front_mut() {
                Some(head) if head.entry.id == id && !head.entry.completed => {
                    head.entry.response = text.to_string();
                    head.entry.dirty = true;
                }
                _ => return,
            }
        }
        (self.hooks.on_changed)();
    }

    /// Finalize the in-flight entry and start the next one.
    fn complete_head(self: &Arc<Self>, id: u64, result: Result<GcodeReply, TransportError>) {
        if let Some(timer) = self.nudge_timer.lock().take() {
            timer.abort();
        }

        let (entry, callback, start_next) = {
            let mut inner = self.inner.lock();
            match inner.queue.front() {
                Some(head) if head.entry.id == id => {}
                _ => return,
            }
            let mut queued = inner.queue.pop_front().expect("head checked above");
            let entry = &mut queued.entry;
            entry.completed = true;
            match result {
                Ok(reply) => {
                    entry.error = reply.status_error;
                    entry.response = reply.response;
                }
                Err(err) => {
                    // Partial response text accumulated so far is kept.
                    entry.error = Some(err.to_string());
                }
            }
            entry.is_error = entry.error.is_some() || response_has_error_marker(&entry.response);
            entry.dirty = true;
            inner.history.push_back(queued.entry.clone());
            inner.enforce_cap();
            (queued.entry, queued.callback, !inner.queue.is_empty())
        };

        if entry.is_error {
            tracing::warn!(
                "Command #{} ({}) failed: {}",
                entry.id,
                entry.reason,
                entry.error.as_deref().unwrap_or("device reported an error")
            );
            (self.hooks.on_command_error)(&entry);
        }

        if start_next {
            self.transmit_head();
        }
        (self.hooks.on_changed)();
        (self.hooks.request_status_refresh)();
        if let Some(callback) = callback {
            callback(&entry);
        }
    }

    /// Arm the post-transmit status nudge timer.
    fn start_status_nudge(self: &Arc<Self>) {
        let sequencer = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(STATUS_NUDGE_DELAY).await;
            (sequencer.hooks.request_status_refresh)();
        });
        if let Some(previous) = self.nudge_timer.lock().replace(timer) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::NoOpTransport;

    #[tokio::test]
    async fn ids_wrap_to_one_and_never_hit_zero() {
        let sequencer =
            CommandSequencer::new(Arc::new(NoOpTransport::new()), SequencerHooks::default());
        sequencer.inner.lock().next_id = ID_WRAP_LIMIT;
        sequencer.send("Send command", "M117 a", None);
        sequencer.send("Send command", "M117 b", None);

        let queue = sequencer.queue_snapshot();
        assert_eq!(queue[0].id, ID_WRAP_LIMIT);
        assert_eq!(queue[1].id, 1);
    }

    #[test]
    fn result_text_annotates_pending_and_failed_entries() {
        let mut entry = CommandEntry::new(7, "Send command".to_string(), vec!["M114".to_string()]);
        assert_eq!(entry.result_text(), "(pending)");

        entry.response = "X:0.0 Y:0.0\n".to_string();
        assert_eq!(entry.result_text(), "X:0.0 Y:0.0\n(pending)");

        entry.completed = true;
        assert_eq!(entry.result_text(), "X:0.0 Y:0.0");

        entry.error = Some("Network error".to_string());
        assert_eq!(entry.result_text(), "X:0.0 Y:0.0\nError: Network error");
    }

    #[test]
    fn request_body_is_newline_joined_and_terminated() {
        let entry = CommandEntry::new(
            1,
            "Set heater setpoints".to_string(),
            vec!["M104 F B S60".to_string(), "M104 F T S210".to_string()],
        );
        assert_eq!(entry.request_body(), "M104 F B S60\nM104 F T S210\n");
        assert_eq!(entry.display_command(), "M104 F B S60; M104 F T S210");
    }
}
