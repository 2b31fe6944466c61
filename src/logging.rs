//! Logging System
//!
//! Structured logging through `tracing`. Level, format and destination come
//! from [`LoggingConfig`], with `GRIDINV_LOG*` environment variables taking
//! precedence.

use crate::error::InventoryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "GRIDINV_LOG";
const ENV_FORMAT: &str = "GRIDINV_LOG_FORMAT";
const ENV_OUTPUT: &str = "GRIDINV_LOG_OUTPUT";
const ENV_FILE: &str = "GRIDINV_LOG_FILE";
const ENV_MODULES: &str = "GRIDINV_LOG_MODULES";

/// Line format of emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(InventoryError::ConfigError(format!(
                "unknown log format '{}', expected text or json",
                other
            ))),
        }
    }
}

/// Where records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
    #[serde(rename = "file+stderr")]
    FileAndStderr,
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }
}

impl FromStr for LogOutput {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "stdout" => LogOutput::Stdout,
            "stderr" => LogOutput::Stderr,
            "file" => LogOutput::File,
            "file+stderr" => LogOutput::FileAndStderr,
            "both" => LogOutput::Both,
            other => {
                return Err(InventoryError::ConfigError(format!(
                    "unknown log output '{}', expected stdout, stderr, file, file+stderr or both",
                    other
                )))
            }
        })
    }
}

/// `[logging]` section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Default filter level; `off` silences everything
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Only read when `output` writes to a file
    pub file: Option<PathBuf>,
    /// ANSI colors for text output on a terminal stream
    pub color: bool,
    /// Per-target levels, e.g. `gridinv::sync = "debug"`
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: None,
            color: true,
            modules: HashMap::new(),
        }
    }
}

/// Log file location: `GRIDINV_LOG_FILE`, then the configured path, then the
/// platform state directory.
pub fn resolve_log_file_path(configured: Option<PathBuf>) -> Result<PathBuf, InventoryError> {
    let from_env = std::env::var_os(ENV_FILE)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    if let Some(path) = from_env.or(configured.filter(|p| !p.as_os_str().is_empty())) {
        return Ok(path);
    }

    let dirs = directories::ProjectDirs::from("", "gridinv", "gridinv").ok_or_else(|| {
        InventoryError::ConfigError("no home directory to place the log file in".to_string())
    })?;
    // state_dir is Linux only
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(base.join("gridinv.log"))
}

/// Install the global subscriber. Environment variables override `config`.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), InventoryError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()
            .map_err(|e| InventoryError::ConfigError(e.to_string()));
    }

    let filter = build_filter(config)?;
    let format = env_override(ENV_FORMAT).unwrap_or(config.format);
    let output = match std::env::var(ENV_OUTPUT) {
        Ok(raw) => raw.parse()?,
        Err(_) => config.output,
    };
    let writer = make_writer(output, config)?;
    let ansi = config.color && !output.writes_file();

    let registry = Registry::default().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.map_err(|e| InventoryError::ConfigError(format!("subscriber already set: {}", e)))
}

/// Unparseable values in the environment are ignored rather than fatal.
fn env_override<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn make_writer(output: LogOutput, config: &LoggingConfig) -> Result<BoxMakeWriter, InventoryError> {
    Ok(match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Both => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        LogOutput::File => BoxMakeWriter::new(open_log_file(config)?),
        LogOutput::FileAndStderr => {
            BoxMakeWriter::new(open_log_file(config)?.and(std::io::stderr))
        }
    })
}

fn open_log_file(config: &LoggingConfig) -> Result<File, InventoryError> {
    let path = resolve_log_file_path(config.file.clone())?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            InventoryError::ConfigError(format!("cannot create {}: {}", dir.display(), e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| InventoryError::ConfigError(format!("cannot open {}: {}", path.display(), e)))
}

/// `GRIDINV_LOG` replaces the whole filter; otherwise the configured level
/// plus per-module directives from config and `GRIDINV_LOG_MODULES`.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, InventoryError> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_FILTER) {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let env_modules = std::env::var(ENV_MODULES).unwrap_or_default();
    let env_pairs = env_modules
        .split(',')
        .filter_map(|spec| spec.split_once('='))
        .map(|(target, level)| (target.trim(), level.trim()));
    let config_pairs = config
        .modules
        .iter()
        .map(|(target, level)| (target.as_str(), level.as_str()));

    config_pairs
        .chain(env_pairs)
        .try_fold(EnvFilter::new(&config.level), |filter, (target, level)| {
            let directive = format!("{}={}", target, level).parse::<Directive>().map_err(|e| {
                InventoryError::ConfigError(format!("bad directive for {}: {}", target, e))
            })?;
            Ok(filter.add_directive(directive))
        })
}
