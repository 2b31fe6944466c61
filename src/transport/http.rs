//! Capability client backed by `reqwest` on a tokio runtime.
//!
//! Each post is spawned onto the runtime; its callback runs on a runtime
//! worker thread once the request finishes.

use super::{CapabilityTransport, HttpCallback, HttpOutcome, RequestBody};
use crate::error::TransportError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// HTTP capability client for one simulator connection
pub struct HttpCapabilityClient {
    client: reqwest::Client,
    runtime: Handle,
    capabilities: RwLock<HashMap<String, String>>,
    closed: Arc<AtomicBool>,
}

impl HttpCapabilityClient {
    pub fn new(runtime: Handle) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            client,
            runtime,
            capabilities: RwLock::new(HashMap::new()),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the capability table, e.g. after a region change
    pub fn set_capabilities(&self, capabilities: HashMap<String, String>) {
        *self.capabilities.write() = capabilities;
    }

    pub fn insert_capability(&self, name: impl Into<String>, url: impl Into<String>) {
        self.capabilities.write().insert(name.into(), url.into());
    }

    /// Stop accepting requests; in-flight requests report `Cancelled`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.capabilities.write().clear();
    }
}

impl CapabilityTransport for HttpCapabilityClient {
    fn capability_uri(&self, name: &str) -> Option<String> {
        self.capabilities.read().get(name).cloned()
    }

    fn post(
        &self,
        url: &str,
        body: RequestBody,
        timeout: Duration,
        on_result: HttpCallback,
    ) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(
                "capability client is closed".to_string(),
            ));
        }
        let parsed = reqwest::Url::parse(url).map_err(|e| TransportError::Http(e.to_string()))?;

        let request = match body {
            RequestBody::Osd(value) => self.client.post(parsed).json(&value),
            RequestBody::Bytes(bytes) => self
                .client
                .post(parsed)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        }
        .timeout(timeout);

        let closed = Arc::clone(&self.closed);
        let target = url.to_string();
        self.runtime.spawn(async move {
            let outcome = match request.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => match response.json::<Value>().await {
                        Ok(value) => HttpOutcome::Completed(value),
                        Err(e) => HttpOutcome::Failed(format!("invalid response body: {}", e)),
                    },
                    Err(e) => HttpOutcome::Failed(e.to_string()),
                },
                Err(e) if e.is_timeout() => HttpOutcome::Failed("request timed out".to_string()),
                Err(e) => HttpOutcome::Failed(e.to_string()),
            };

            if closed.load(Ordering::SeqCst) {
                debug!(url = %target, "Dropping capability reply after close");
                on_result(HttpOutcome::Cancelled);
                return;
            }
            if let HttpOutcome::Failed(reason) = &outcome {
                warn!(url = %target, reason = %reason, "Capability request failed");
            }
            on_result(outcome);
        });

        Ok(())
    }
}
