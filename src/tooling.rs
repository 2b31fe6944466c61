//! Tooling Layer
//!
//! Command-line inspection of inventory caches and task-inventory dumps.

pub mod cli;

pub use cli::{CacheArgs, Cli, CliContext, Commands};
