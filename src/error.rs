//! Error types for the inventory subsystem.

use thiserror::Error;
use uuid::Uuid;

/// Storage and cache errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cache codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Cache file has bad magic {found:#010x}")]
    BadMagic { found: u32 },

    #[error("Cache file version {found} does not match expected version {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Unknown folder: {0}")]
    UnknownFolder(Uuid),
}

/// Errors raised by transport collaborators before a request is dispatched
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Capability {0} is not currently available")]
    CapabilityUnavailable(String),

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("HTTP request failed: {0}")]
    Http(String),
}

/// Errors surfaced by inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for InventoryError {
    fn from(err: config::ConfigError) -> Self {
        InventoryError::ConfigError(err.to_string())
    }
}
