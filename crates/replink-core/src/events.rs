//! UI event fan-out
//!
//! The dashboard render layer is out of scope here; what it needs from the
//! core is a coarse "this part of the page may be stale" signal. Components
//! publish [`UiEvent`]s through a broadcast dispatcher and the render layer
//! subscribes and redraws whatever the event names.

use tokio::sync::broadcast;

/// Render-invalidation events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// The command queue or history changed
    GcodeChanged,
    /// A new machine-state snapshot was installed
    MachineStateChanged,
    /// A new configuration snapshot was installed
    ConfigChanged,
    /// The machine-status poll condition changed
    StatusCondition,
    /// The configuration poll condition changed
    ConfigCondition,
    /// A directory listing finished loading
    DirListChanged,
    /// Upload progress or result changed
    UploadChanged,
    /// The dialog queue changed
    DialogChanged,
}

impl std::fmt::Display for UiEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiEvent::GcodeChanged => write!(f, "gcode changed"),
            UiEvent::MachineStateChanged => write!(f, "machine state changed"),
            UiEvent::ConfigChanged => write!(f, "config changed"),
            UiEvent::StatusCondition => write!(f, "status condition changed"),
            UiEvent::ConfigCondition => write!(f, "config condition changed"),
            UiEvent::DirListChanged => write!(f, "directory listing changed"),
            UiEvent::UploadChanged => write!(f, "upload changed"),
            UiEvent::DialogChanged => write!(f, "dialog queue changed"),
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for UI events.
    tx: broadcast::Sender<UiEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer (default 100)
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// An event published with no subscribers is silently dropped; the
    /// render layer may not have attached yet.
    pub fn publish(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
