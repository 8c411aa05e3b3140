//! File upload to the SD card
//!
//! One upload at a time. Byte counters are driven by transport progress
//! events; the completed result stays visible until the render layer
//! acknowledges it, then until the user starts over.

use crate::transport::Transport;
use parking_lot::Mutex;
use replink_core::paths::is_dest_path_valid;
use replink_core::{Callback, Error, ValidationError};
use std::sync::Arc;

/// Hooks the controller fires as an upload progresses.
pub struct UploadHooks {
    /// Progress or result changed; drives re-render
    pub on_update: Callback,
    /// The upload failed; `(action, error)` drives the error dialog
    pub on_error: Box<dyn Fn(&str, &str) + Send + Sync>,
}

impl Default for UploadHooks {
    fn default() -> Self {
        Self {
            on_update: Box::new(|| {}),
            on_error: Box::new(|_, _| {}),
        }
    }
}

#[derive(Default)]
struct UploadState {
    uploading: bool,
    source_file_name: Option<String>,
    destination_path: Option<String>,
    total_bytes: u64,
    uploaded_bytes: u64,
    result_pending: bool,
    have_result: bool,
    upload_error: Option<String>,
}

/// Upload controller.
pub struct FileUploadController {
    transport: Arc<dyn Transport>,
    hooks: UploadHooks,
    state: Mutex<UploadState>,
}

impl FileUploadController {
    /// Create an idle upload controller.
    pub fn new(transport: Arc<dyn Transport>, hooks: UploadHooks) -> Arc<Self> {
        Arc::new(Self {
            transport,
            hooks,
            state: Mutex::new(UploadState::default()),
        })
    }

    /// Whether an upload is in progress.
    pub fn is_uploading(&self) -> bool {
        self.state.lock().uploading
    }

    /// Name of the file being (or last) uploaded.
    pub fn source_file_name(&self) -> Option<String> {
        self.state.lock().source_file_name.clone()
    }

    /// Destination path of the current or last upload.
    pub fn destination_path(&self) -> Option<String> {
        self.state.lock().destination_path.clone()
    }

    /// Total byte count of the current upload.
    pub fn total_bytes(&self) -> u64 {
        self.state.lock().total_bytes
    }

    /// Bytes uploaded so far.
    pub fn uploaded_bytes(&self) -> u64 {
        self.state.lock().uploaded_bytes
    }

    /// Whether a result is waiting for acknowledgment by the render layer.
    pub fn is_result_pending(&self) -> bool {
        self.state.lock().result_pending
    }

    /// Whether a result (success or failure) is available.
    pub fn have_result(&self) -> bool {
        self.state.lock().have_result
    }

    /// Error of the last upload, `None` on success.
    pub fn upload_error(&self) -> Option<String> {
        self.state.lock().upload_error.clone()
    }

    /// Acknowledge a pending result.
    pub fn ack_result(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.result_pending);
        state.result_pending = false;
    }

    /// Forget the last result. No-op while an upload is running.
    pub fn clear_result(&self) {
        let mut state = self.state.lock();
        if !state.uploading {
            state.source_file_name = None;
            state.destination_path = None;
            state.result_pending = false;
            state.have_result = false;
            state.upload_error = None;
        }
    }

    /// Start an upload.
    ///
    /// The destination must be a valid absolute file path and no other
    /// upload may be running; both are rejected before any network call.
    pub fn start_upload(
        self: &Arc<Self>,
        source_file_name: impl Into<String>,
        destination_path: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<(), Error> {
        let destination_path = destination_path.into();
        if !is_dest_path_valid(&destination_path) {
            return Err(ValidationError::BadDestinationPath.into());
        }
        {
            let mut state = self.state.lock();
            if state.uploading {
                return Err(Error::other("Upload already in progress"));
            }
            state.source_file_name = None;
            state.destination_path = None;
            state.result_pending = false;
            state.have_result = false;
            state.upload_error = None;

            state.uploading = true;
            state.source_file_name = Some(source_file_name.into());
            state.destination_path = Some(destination_path.clone());
            state.total_bytes = data.len() as u64;
            state.uploaded_bytes = 0;
        }

        let controller = self.clone();
        tokio::spawn(async move {
            let progress_target = controller.clone();
            let progress: Arc<dyn Fn(u64, u64) + Send + Sync> =
                Arc::new(move |uploaded, total| progress_target.record_progress(uploaded, total));
            let result = controller
                .transport
                .upload(&destination_path, data, progress)
                .await;
            controller.request_completed(result.err().map(|err| err.to_string()));
        });
        Ok(())
    }

    fn record_progress(&self, uploaded: u64, total: u64) {
        {
            let mut state = self.state.lock();
            if !state.uploading {
                return;
            }
            if total > 0 {
                state.total_bytes = total;
            }
            state.uploaded_bytes = uploaded;
        }
        (self.hooks.on_update)();
    }

    fn request_completed(&self, error: Option<String>) {
        let dialog = {
            let mut state = self.state.lock();
            debug_assert!(state.uploading);
            state.uploading = false;
            state.result_pending = true;
            state.have_result = true;
            state.upload_error = error.clone();
            error.map(|err| {
                (
                    format!(
                        "Upload file {} to {}",
                        state.source_file_name.as_deref().unwrap_or(""),
                        state.destination_path.as_deref().unwrap_or("")
                    ),
                    err,
                )
            })
        };
        if let Some((action, err)) = dialog {
            (self.hooks.on_error)(&action, &err);
        }
        (self.hooks.on_update)();
    }
}
