//! Transport Collaborators
//!
//! The inventory core talks to the network through three seams: a datagram
//! channel carrying typed messages, a capability (HTTP) client that posts one
//! request per named endpoint, and a file source for task-inventory dumps.
//! Replies arrive on whatever thread the collaborator uses.

pub mod http;

use crate::error::TransportError;
use crate::protocol::OutgoingMessage;
use serde_json::Value;
use std::time::Duration;

pub use http::HttpCapabilityClient;

/// Body of a capability request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured document
    Osd(Value),
    /// Raw asset bytes
    Bytes(Vec<u8>),
}

/// Terminal state of a capability request; delivered exactly once
#[derive(Debug, Clone, PartialEq)]
pub enum HttpOutcome {
    Completed(Value),
    Failed(String),
    Cancelled,
}

pub type HttpCallback = Box<dyn FnOnce(HttpOutcome) + Send + 'static>;

pub type FileCallback = Box<dyn FnOnce(Option<Vec<u8>>) + Send + 'static>;

/// Legacy datagram channel
pub trait DatagramTransport: Send + Sync {
    fn send(&self, message: OutgoingMessage) -> Result<(), TransportError>;
}

/// Per-session capability endpoints
pub trait CapabilityTransport: Send + Sync {
    /// URL of a named capability on the current connection
    fn capability_uri(&self, name: &str) -> Option<String>;

    /// Dispatch a POST; `Err` means nothing was sent and `on_result` is dropped
    fn post(
        &self,
        url: &str,
        body: RequestBody,
        timeout: Duration,
        on_result: HttpCallback,
    ) -> Result<(), TransportError>;
}

/// Source of task-inventory dump files named by the simulator
pub trait TaskFileSource: Send + Sync {
    fn request_file(&self, filename: &str, on_done: FileCallback) -> Result<(), TransportError>;
}

/// Capability transport for sessions without any capabilities
pub struct NoCapabilities;

impl CapabilityTransport for NoCapabilities {
    fn capability_uri(&self, _name: &str) -> Option<String> {
        None
    }

    fn post(
        &self,
        url: &str,
        _body: RequestBody,
        _timeout: Duration,
        _on_result: HttpCallback,
    ) -> Result<(), TransportError> {
        Err(TransportError::CapabilityUnavailable(url.to_string()))
    }
}

/// File source for sessions without a file transfer channel
pub struct NoTaskFiles;

impl TaskFileSource for NoTaskFiles {
    fn request_file(&self, filename: &str, _on_done: FileCallback) -> Result<(), TransportError> {
        Err(TransportError::SendFailed(format!(
            "no file transfer channel for {}",
            filename
        )))
    }
}

/// Caller's transport constraint for a verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPreference {
    /// HTTP when possible, datagram otherwise
    #[default]
    Any,
    /// HTTP or nothing
    HttpOnly,
}

/// Transport chosen for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportRoute {
    Http(String),
    Datagram,
    /// No usable transport; carries the reason reported to the caller
    Unavailable(String),
}

impl TransportRoute {
    /// Pick the transport for a verb that can use either
    pub fn select(
        capability: &str,
        http_enabled: bool,
        url: Option<String>,
        preference: TransportPreference,
    ) -> Self {
        match (http_enabled, url, preference) {
            (true, Some(url), _) => TransportRoute::Http(url),
            (_, _, TransportPreference::Any) => TransportRoute::Datagram,
            (false, _, TransportPreference::HttpOnly) => {
                TransportRoute::Unavailable("HTTP inventory is disabled".to_string())
            }
            (true, None, TransportPreference::HttpOnly) => TransportRoute::Unavailable(format!(
                "{} capability is not currently available",
                capability
            )),
        }
    }

    /// Route taken when dispatching over HTTP failed before anything was sent
    pub fn after_http_failure(preference: TransportPreference, reason: String) -> Self {
        match preference {
            TransportPreference::Any => TransportRoute::Datagram,
            TransportPreference::HttpOnly => TransportRoute::Unavailable(reason),
        }
    }
}
