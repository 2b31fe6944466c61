//! ConfigLoader: layers defaults, an optional file and the environment.

use super::InventoryConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    /// Precedence: defaults (lowest) -> file -> GRIDINV__ environment (highest).
    pub fn load(path: Option<&Path>) -> Result<InventoryConfig, ConfigError> {
        let mut builder = Self::builder_with_defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let builder = builder.add_source(
            Environment::with_prefix("GRIDINV")
                .separator("__")
                .try_parsing(true),
        );
        builder.build()?.try_deserialize()
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = InventoryConfig::default();
        Config::builder()
            .set_default("http_inventory", defaults.http_inventory)?
            .set_default("request_timeout_ms", defaults.request_timeout_ms)?
            .set_default("give_folder_timeout_ms", defaults.give_folder_timeout_ms)?
            .set_default("give_item_timeout_ms", defaults.give_item_timeout_ms)
    }
}
