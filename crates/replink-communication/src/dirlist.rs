//! SD-card directory listing
//!
//! Same one-in-flight discipline as the pollers: navigating while a listing
//! is loading remembers the newest requested directory and re-requests it
//! once the outstanding load completes, so rapid navigation never piles up
//! concurrent requests or shows a stale directory.

use crate::transport::Transport;
use parking_lot::Mutex;
use replink_core::{Callback, DirListing, TransportError};
use std::sync::Arc;

/// Hooks the controller fires as listings progress.
pub struct DirListHooks {
    /// A listing finished loading; drives re-render
    pub on_dir_loaded: Callback,
    /// A listing failed; `(action, error)` drives the error dialog
    pub on_error: Box<dyn Fn(&str, &str) + Send + Sync>,
    /// A status refresh should happen soon (non-blocking hint)
    pub request_status_refresh: Callback,
    /// Whether loading a listing should nudge the status poller afterwards.
    /// Listing a directory can implicitly mount the card, so the mount
    /// indicator needs a refresh when the card was not mounted on request.
    pub should_nudge_status: Box<dyn Fn() -> bool + Send + Sync>,
}

impl Default for DirListHooks {
    fn default() -> Self {
        Self {
            on_dir_loaded: Box::new(|| {}),
            on_error: Box::new(|_, _| {}),
            request_status_refresh: Box::new(|| {}),
            should_nudge_status: Box::new(|| false),
        }
    }
}

struct DirListState {
    requested_dir: Option<String>,
    need_rerequest: bool,
    update_status_then: bool,
    loaded_dir: Option<String>,
    loaded_result: Option<DirListing>,
    dirty: bool,
    ever_requested: bool,
}

/// Directory listing controller.
pub struct DirListController {
    transport: Arc<dyn Transport>,
    hooks: DirListHooks,
    state: Mutex<DirListState>,
}

impl DirListController {
    /// Create a controller; nothing is loaded until [`request_dir`].
    ///
    /// [`request_dir`]: DirListController::request_dir
    pub fn new(transport: Arc<dyn Transport>, hooks: DirListHooks) -> Arc<Self> {
        Arc::new(Self {
            transport,
            hooks,
            state: Mutex::new(DirListState {
                requested_dir: None,
                need_rerequest: false,
                update_status_then: false,
                loaded_dir: None,
                loaded_result: None,
                dirty: true,
                ever_requested: false,
            }),
        })
    }

    /// Request a directory listing.
    ///
    /// While a request is outstanding the newest directory wins and is
    /// loaded right after the current request completes.
    pub fn request_dir(self: &Arc<Self>, requested_dir: impl Into<String>) {
        let start = {
            let mut state = self.state.lock();
            let previous = state.requested_dir.replace(requested_dir.into());
            if previous.is_some() {
                state.need_rerequest = true;
                false
            } else {
                true
            }
        };
        if start {
            self.start_request();
        }
    }

    /// Directory currently loading, if any.
    pub fn loading_dir(&self) -> Option<String> {
        self.state.lock().requested_dir.clone()
    }

    /// Directory of the last successful load.
    pub fn loaded_dir(&self) -> Option<String> {
        self.state.lock().loaded_dir.clone()
    }

    /// Result of the last successful load.
    pub fn loaded_result(&self) -> Option<DirListing> {
        self.state.lock().loaded_result.clone()
    }

    /// Whether any listing was ever requested.
    pub fn ever_requested(&self) -> bool {
        self.state.lock().ever_requested
    }

    /// Whether the rendered listing may be stale.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Clear the redraw flag after a render commit.
    pub fn clear_dirty(&self) {
        self.state.lock().dirty = false;
    }

    fn start_request(self: &Arc<Self>) {
        let dir = {
            let mut state = self.state.lock();
            state.need_rerequest = false;
            state.update_status_then = (self.hooks.should_nudge_status)();
            state.ever_requested = true;
            state
                .requested_dir
                .clone()
                .expect("start_request with no requested dir")
        };

        let controller = self.clone();
        tokio::spawn(async move {
            let result = controller.transport.list_dir(&dir).await;
            controller.request_completed(result);
        });
    }

    fn request_completed(self: &Arc<Self>, result: Result<DirListing, TransportError>) {
        let (nudge, rerequest) = {
            let state = self.state.lock();
            (state.update_status_then, state.need_rerequest)
        };
        if nudge {
            (self.hooks.request_status_refresh)();
        }
        if rerequest {
            self.start_request();
            return;
        }

        let requested_dir = {
            let mut state = self.state.lock();
            state
                .requested_dir
                .take()
                .expect("completion with no requested dir")
        };
        match result {
            Ok(listing) => {
                {
                    let mut state = self.state.lock();
                    state.loaded_dir = Some(requested_dir);
                    state.loaded_result = Some(listing);
                    state.dirty = true;
                }
                (self.hooks.on_dir_loaded)();
            }
            Err(err) => {
                (self.hooks.on_error)(
                    &format!("Load directory {requested_dir}"),
                    &err.to_string(),
                );
            }
        }
    }
}
