//! Configuration
//!
//! Settings for the inventory manager, layered by [`ConfigLoader`]: built-in
//! defaults, then an optional TOML file, then `GRIDINV__*` environment
//! variables.

mod loader;

pub use loader::ConfigLoader;

use crate::error::InventoryError;
use crate::logging::LoggingConfig;
use crate::types::AgentID;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Prefer capability (HTTP) requests over datagrams when available
    #[serde(default = "default_true")]
    pub http_inventory: bool,

    /// Timeout handed to the capability client, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Bounded wait for a folder listing while giving a folder
    #[serde(default = "default_give_folder_timeout_ms")]
    pub give_folder_timeout_ms: u64,

    /// Bounded wait for each item fetch while giving a folder
    #[serde(default = "default_give_item_timeout_ms")]
    pub give_item_timeout_ms: u64,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache file; None means `<cache dir>/<owner>.inv`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_give_folder_timeout_ms() -> u64 {
    15_000
}

fn default_give_item_timeout_ms() -> u64 {
    10_000
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            http_inventory: default_true(),
            request_timeout_ms: default_request_timeout_ms(),
            give_folder_timeout_ms: default_give_folder_timeout_ms(),
            give_item_timeout_ms: default_give_item_timeout_ms(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl InventoryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn give_folder_timeout(&self) -> Duration {
        Duration::from_millis(self.give_folder_timeout_ms)
    }

    pub fn give_item_timeout(&self) -> Duration {
        Duration::from_millis(self.give_item_timeout_ms)
    }

    /// Cache file for `owner`, falling back to the platform cache directory
    pub fn cache_path(&self, owner: AgentID) -> Result<PathBuf, InventoryError> {
        if let Some(path) = &self.cache.path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("", "gridinv", "gridinv").ok_or_else(|| {
            InventoryError::ConfigError("Could not determine platform cache directory".to_string())
        })?;
        Ok(dirs.cache_dir().join(format!("{}.inv", owner)))
    }
}
