//! Machine transport
//!
//! The `Transport` trait is the seam between the in-memory pipeline and the
//! printer's HTTP interface. Production code uses [`HttpTransport`]; tests
//! substitute their own implementations to script exchanges.

use async_trait::async_trait;
use futures_util::StreamExt;
use replink_core::{ConfigResponse, DirListing, MachineState, TransportError};
use std::sync::Arc;

/// Upload stream chunk size
const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Outcome of a `rr_gcode` exchange that produced an HTTP response.
///
/// A non-success HTTP status is recorded in `status_error` rather than
/// failing the exchange, because the response body still carries the
/// machine's output and is shown to the user either way.
#[derive(Debug, Clone)]
pub struct GcodeReply {
    /// `None` on HTTP success, the status line otherwise
    pub status_error: Option<String>,
    /// Raw response body
    pub response: String,
}

/// HTTP interface of the printer, one method per endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET /rr_status`
    async fn fetch_status(&self) -> Result<MachineState, TransportError>;

    /// `GET /rr_config`
    async fn fetch_config(&self) -> Result<ConfigResponse, TransportError>;

    /// `POST /rr_gcode` with a newline-terminated command batch.
    ///
    /// `progress` is invoked with the accumulated response text as partial
    /// body data arrives; implementations that cannot stream may invoke it
    /// once with the full body or not at all.
    async fn send_gcode(
        &self,
        body: String,
        progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<GcodeReply, TransportError>;

    /// `GET /rr_files?flagDirs=1&dir=...`
    async fn list_dir(&self, dir: &str) -> Result<DirListing, TransportError>;

    /// `POST /rr_upload?name=...` with the raw file body.
    ///
    /// `progress` receives (uploaded, total) byte counts.
    async fn upload(
        &self,
        dest_path: &str,
        data: Vec<u8>,
        progress: Arc<dyn Fn(u64, u64) + Send + Sync>,
    ) -> Result<(), TransportError>;
}

/// Transport over the printer's HTTP interface.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for a machine base URL, e.g. `http://printer.local`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path_and_query: &str,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .get(self.url(path_and_query))
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.to_string(),
            });
        }
        let body = response.text().await.map_err(network_error)?;
        serde_json::from_str(&body).map_err(|err| TransportError::InvalidPayload {
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_status(&self) -> Result<MachineState, TransportError> {
        self.get_json("/rr_status").await
    }

    async fn fetch_config(&self) -> Result<ConfigResponse, TransportError> {
        self.get_json("/rr_config").await
    }

    async fn send_gcode(
        &self,
        body: String,
        progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<GcodeReply, TransportError> {
        tracing::debug!("Sending gcode batch: {:?}", body);
        let mut response = self
            .client
            .post(self.url("/rr_gcode"))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let status_error = if status.is_success() {
            None
        } else {
            Some(status.to_string())
        };

        let mut text = String::new();
        while let Some(chunk) = response.chunk().await.map_err(network_error)? {
            text.push_str(&String::from_utf8_lossy(&chunk));
            progress(&text);
        }

        Ok(GcodeReply {
            status_error,
            response: text,
        })
    }

    async fn list_dir(&self, dir: &str) -> Result<DirListing, TransportError> {
        let query = format!("/rr_files?flagDirs=1&dir={}", urlencoding::encode(dir));
        self.get_json(&query).await
    }

    async fn upload(
        &self,
        dest_path: &str,
        data: Vec<u8>,
        progress: Arc<dyn Fn(u64, u64) + Send + Sync>,
    ) -> Result<(), TransportError> {
        let total = data.len() as u64;
        progress(0, total);

        let chunks: Vec<Vec<u8>> = data
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        let mut uploaded: u64 = 0;
        let body_progress = progress.clone();
        let stream = futures_util::stream::iter(chunks).map(move |chunk: Vec<u8>| {
            uploaded += chunk.len() as u64;
            body_progress(uploaded.min(total), total);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        });

        let response = self
            .client
            .post(self.url(&format!(
                "/rr_upload?name={}",
                urlencoding::encode(dest_path)
            )))
            // The embedded server needs an up-front length; the body is
            // still streamed so progress can be observed.
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Transport that answers every request with an empty success.
///
/// Stands in where a real machine is not reachable, e.g. in examples and
/// doc tests.
#[derive(Debug, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    /// Create a no-op transport
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for NoOpTransport {
    async fn fetch_status(&self) -> Result<MachineState, TransportError> {
        Ok(MachineState::default())
    }

    async fn fetch_config(&self) -> Result<ConfigResponse, TransportError> {
        Ok(ConfigResponse {
            options: Vec::new(),
        })
    }

    async fn send_gcode(
        &self,
        _body: String,
        _progress: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<GcodeReply, TransportError> {
        Ok(GcodeReply {
            status_error: None,
            response: "ok\n".to_string(),
        })
    }

    async fn list_dir(&self, dir: &str) -> Result<DirListing, TransportError> {
        Ok(DirListing {
            dir: dir.to_string(),
            files: Vec::new(),
        })
    }

    async fn upload(
        &self,
        _dest_path: &str,
        data: Vec<u8>,
        progress: Arc<dyn Fn(u64, u64) + Send + Sync>,
    ) -> Result<(), TransportError> {
        let total = data.len() as u64;
        progress(total, total);
        Ok(())
    }
}

fn network_error(err: reqwest::Error) -> TransportError {
    TransportError::Network {
        reason: err.to_string(),
    }
}
