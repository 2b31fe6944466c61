//! CLI Tooling
//!
//! Offline inspection of inventory caches and task-inventory dumps. Nothing
//! here talks to a grid; every command works from files on disk.

use crate::config::{ConfigLoader, InventoryConfig};
use crate::error::InventoryError;
use crate::inventory::{item_crc, InventoryNode};
use crate::logging::init_logging;
use crate::store::persistence::cache_owner;
use crate::store::{InventoryStore, StoreInner};
use crate::task_inventory::parse_task_inventory;
use crate::types::{FolderID, ZERO_ID};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// gridinv - inspect cached grid inventories
#[derive(Parser)]
#[command(name = "gridinv")]
#[command(about = "Inspect cached virtual-world inventories and task-inventory dumps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Where a command finds its inventory cache
#[derive(clap::Args, Debug, Clone)]
pub struct CacheArgs {
    /// Cache file; defaults to the configured cache for --owner
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Owner whose default cache should be read
    #[arg(long)]
    pub owner: Option<Uuid>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the cached folder tree
    Tree {
        #[command(flatten)]
        source: CacheArgs,
        /// Folder to start from (default: the root)
        #[arg(long)]
        folder: Option<Uuid>,
        /// Maximum depth to print
        #[arg(long)]
        depth: Option<usize>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Find nodes by slash-separated name path
    Find {
        #[command(flatten)]
        source: CacheArgs,
        /// Path below the base folder, e.g. "My Inventory/Objects/Chair"
        path: String,
        /// Folder the path is relative to (default: the root)
        #[arg(long)]
        folder: Option<Uuid>,
        /// Report every match instead of the first
        #[arg(long)]
        all: bool,
    },
    /// Parse a task-inventory dump file
    Task {
        /// Dump file as downloaded from the simulator
        file: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show item checksums from a cache
    Crc {
        #[command(flatten)]
        source: CacheArgs,
        /// Only this item
        #[arg(long)]
        item: Option<Uuid>,
    },
}

/// Resolved settings for one CLI invocation
pub struct CliContext {
    config: InventoryConfig,
}

impl CliContext {
    /// Load configuration; logging is initialised separately
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, InventoryError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    /// Start logging with command-line overrides applied to the configured settings
    pub fn init_logging(&self, cli: &Cli) -> Result<(), InventoryError> {
        let mut logging = self.config.logging.clone();
        if cli.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            logging.format = format.parse()?;
        }
        if let Some(output) = &cli.log_output {
            logging.output = output.parse()?;
        }
        if let Some(file) = &cli.log_file {
            logging.file = Some(file.clone());
        }
        init_logging(Some(&logging))
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, InventoryError> {
        match command {
            Commands::Tree {
                source,
                folder,
                depth,
                format,
            } => {
                let store = self.open_cache(source)?;
                let base = folder.unwrap_or(ZERO_ID);
                if format == "json" {
                    let inner = store.read();
                    let tree = tree_json(&inner, base, *depth, 0)?;
                    return serde_json::to_string_pretty(&tree)
                        .map_err(|e| InventoryError::MalformedPayload(e.to_string()));
                }
                let inner = store.read();
                let mut rows = Vec::new();
                collect_tree_rows(&inner, base, *depth, 0, &mut rows)?;
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Name", "Kind", "Type", "Id"]);
                for row in rows {
                    table.add_row(row);
                }
                Ok(format!("{}\n{} nodes cached", table, inner.len()))
            }
            Commands::Find {
                source,
                path,
                folder,
                all,
            } => {
                let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.is_empty() {
                    return Err(InventoryError::InvalidArgument(
                        "search path has no segments".to_string(),
                    ));
                }
                let store = self.open_cache(source)?;
                let found = store
                    .read()
                    .find_by_path(folder.unwrap_or(ZERO_ID), &segments, !*all);
                if found.is_empty() {
                    return Ok(format!("No match for {}", path));
                }
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Name", "Kind", "Type", "Id", "Parent"]);
                for node in &found {
                    table.add_row(vec![
                        node.name().to_string(),
                        node_kind(node).to_string(),
                        node_type(node),
                        node.id().to_string(),
                        node.parent_id().to_string(),
                    ]);
                }
                Ok(table.to_string())
            }
            Commands::Task { file, format } => {
                let text = std::fs::read_to_string(file)
                    .map_err(|e| InventoryError::StorageError(e.into()))?;
                let nodes = parse_task_inventory(&text);
                debug!(file = %file.display(), nodes = nodes.len(), "Parsed task inventory");
                if format == "json" {
                    let arr: Vec<_> = nodes
                        .iter()
                        .map(|node| {
                            json!({
                                "id": node.id(),
                                "parent_id": node.parent_id(),
                                "name": node.name(),
                                "kind": node_kind(node),
                                "type": node_type(node),
                            })
                        })
                        .collect();
                    return serde_json::to_string_pretty(&arr)
                        .map_err(|e| InventoryError::MalformedPayload(e.to_string()));
                }
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Name", "Kind", "Type", "Id", "Parent"]);
                for node in &nodes {
                    table.add_row(vec![
                        node.name().to_string(),
                        node_kind(node).to_string(),
                        node_type(node),
                        node.id().to_string(),
                        node.parent_id().to_string(),
                    ]);
                }
                Ok(format!("{}\n{} entries", table, nodes.len()))
            }
            Commands::Crc { source, item } => {
                let store = self.open_cache(source)?;
                let mut items = match item {
                    Some(id) => store
                        .get_item(id)
                        .map(|item| vec![item])
                        .ok_or_else(|| {
                            InventoryError::InvalidArgument(format!("item {} is not cached", id))
                        })?,
                    None => store.items(),
                };
                items.sort_by(|a, b| a.name.cmp(&b.name));
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Name", "Id", "CRC"]);
                for item in &items {
                    table.add_row(vec![
                        item.name.clone(),
                        item.id.to_string(),
                        format!("{:#010x}", item_crc(item)),
                    ]);
                }
                Ok(table.to_string())
            }
        }
    }

    fn cache_path(&self, source: &CacheArgs) -> Result<PathBuf, InventoryError> {
        match (&source.cache, source.owner) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(owner)) => self.config.cache_path(owner),
            (None, None) => Err(InventoryError::InvalidArgument(
                "either --cache or --owner is required".to_string(),
            )),
        }
    }

    fn open_cache(&self, source: &CacheArgs) -> Result<InventoryStore, InventoryError> {
        let path = self.cache_path(source)?;
        load_cache(&path)
    }
}

/// Load a cache file into a store owned by the cache's recorded owner
pub fn load_cache(path: &Path) -> Result<InventoryStore, InventoryError> {
    let owner = cache_owner(path)?;
    let store = InventoryStore::new(owner);
    let restored = store.restore_from_disk(path)?;
    info!(path = %path.display(), owner = %owner, nodes = restored, "Opened inventory cache");
    Ok(store)
}

fn node_kind(node: &InventoryNode) -> &'static str {
    if node.is_folder() {
        "folder"
    } else {
        "item"
    }
}

fn node_type(node: &InventoryNode) -> String {
    match node {
        InventoryNode::Folder(folder) => folder.preferred_type.name().to_string(),
        InventoryNode::Item(item) => item.inventory_type.name().to_string(),
    }
}

fn collect_tree_rows(
    store: &StoreInner,
    folder: FolderID,
    max_depth: Option<usize>,
    depth: usize,
    rows: &mut Vec<Vec<String>>,
) -> Result<(), InventoryError> {
    if max_depth.is_some_and(|max| depth >= max) {
        return Ok(());
    }
    for node in store.get_contents(&folder)? {
        rows.push(vec![
            format!("{}{}", "  ".repeat(depth), node.name()),
            node_kind(&node).to_string(),
            node_type(&node),
            node.id().to_string(),
        ]);
        if node.is_folder() {
            collect_tree_rows(store, node.id(), max_depth, depth + 1, rows)?;
        }
    }
    Ok(())
}

fn tree_json(
    store: &StoreInner,
    folder: FolderID,
    max_depth: Option<usize>,
    depth: usize,
) -> Result<serde_json::Value, InventoryError> {
    let mut children = Vec::new();
    if !max_depth.is_some_and(|max| depth >= max) {
        for node in store.get_contents(&folder)? {
            let mut entry = json!({
                "id": node.id(),
                "name": node.name(),
                "kind": node_kind(&node),
                "type": node_type(&node),
            });
            if node.is_folder() {
                let mut sub = tree_json(store, node.id(), max_depth, depth + 1)?;
                entry["children"] = sub["children"].take();
            }
            children.push(entry);
        }
    }
    Ok(json!({ "id": folder, "children": children }))
}
