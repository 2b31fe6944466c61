//! Disk cache for the inventory tree.
//!
//! Layout: a bincode header (magic, format version, owner id) followed by a
//! recursive dump of the resolved tree starting at the root. Unresolved nodes
//! are not persisted. Restoring rebuilds both indices with an explicit stack.

use super::{InventoryStore, StoreInner};
use crate::error::StorageError;
use crate::inventory::{InventoryFolder, InventoryItem, InventoryNode};
use crate::types::{AgentID, FolderID, ZERO_ID};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Leading magic of every cache file ("INVC")
pub const CACHE_MAGIC: u32 = 0x494E_5643;

/// Format version; files written with any other version are rejected
pub const CACHE_VERSION: u32 = 3;

#[derive(Debug, Serialize, Deserialize)]
struct CacheHeader {
    magic: u32,
    version: u32,
    owner: AgentID,
}

/// One folder of the recursive dump
#[derive(Debug, Serialize, Deserialize)]
struct CachedFolder {
    folder: InventoryFolder,
    items: Vec<InventoryItem>,
    folders: Vec<CachedFolder>,
}

impl CachedFolder {
    fn capture(inner: &StoreInner, folder_id: &FolderID) -> Option<Self> {
        let folder = inner.get_folder(folder_id)?.clone();
        let mut items = Vec::new();
        let mut folders = Vec::new();
        for child in &folder.children {
            if let Some(item) = inner.get_item(child) {
                items.push(item.clone());
            } else if let Some(sub) = Self::capture(inner, child) {
                folders.push(sub);
            }
        }
        Some(Self {
            folder,
            items,
            folders,
        })
    }
}

impl InventoryStore {
    /// Write the resolved tree to `path`
    ///
    /// Returns the number of nodes written, excluding the root.
    pub fn save_to_disk(&self, path: &Path) -> Result<usize, StorageError> {
        let (tree, count) = {
            let inner = self.read();
            let tree = CachedFolder::capture(&inner, &ZERO_ID)
                .ok_or(StorageError::UnknownFolder(ZERO_ID))?;
            (tree, inner.len())
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        let header = CacheHeader {
            magic: CACHE_MAGIC,
            version: CACHE_VERSION,
            owner: self.owner(),
        };
        bincode::serialize_into(&mut writer, &header)?;
        bincode::serialize_into(&mut writer, &tree)?;
        writer.flush()?;

        info!(path = %path.display(), nodes = count, "Saved inventory cache");
        Ok(count)
    }

    /// Replace the tree with the contents of `path`
    ///
    /// The store is cleared first; on any failure it stays empty apart from
    /// the root. Returns the number of nodes restored.
    pub fn restore_from_disk(&self, path: &Path) -> Result<usize, StorageError> {
        let mut inner = self.write();
        inner.clear();

        let mut reader = BufReader::new(File::open(path)?);
        let header = read_header(&mut reader)?;
        if header.owner != self.owner() {
            warn!(
                cache_owner = %header.owner,
                store_owner = %self.owner(),
                "Inventory cache belongs to a different owner"
            );
        }
        let tree: CachedFolder = bincode::deserialize_from(&mut reader)?;

        let restored = rebuild(&mut inner, tree);
        info!(path = %path.display(), nodes = restored, "Restored inventory cache");
        Ok(restored)
    }
}

/// Owner recorded in a cache file's header
pub fn cache_owner(path: &Path) -> Result<AgentID, StorageError> {
    let mut reader = BufReader::new(File::open(path)?);
    Ok(read_header(&mut reader)?.owner)
}

fn read_header(reader: &mut impl Read) -> Result<CacheHeader, StorageError> {
    let header: CacheHeader = bincode::deserialize_from(reader)?;
    if header.magic != CACHE_MAGIC {
        return Err(StorageError::BadMagic {
            found: header.magic,
        });
    }
    if header.version != CACHE_VERSION {
        return Err(StorageError::VersionMismatch {
            expected: CACHE_VERSION,
            found: header.version,
        });
    }
    Ok(header)
}

fn rebuild(inner: &mut StoreInner, root: CachedFolder) -> usize {
    let mut restored = 0;
    let mut stack: Vec<(FolderID, CachedFolder)> = Vec::new();

    for sub in root.folders {
        stack.push((ZERO_ID, sub));
    }
    for mut item in root.items {
        item.parent_id = ZERO_ID;
        inner.link(InventoryNode::Item(item));
        restored += 1;
    }

    while let Some((parent_id, cached)) = stack.pop() {
        let mut folder = cached.folder;
        let folder_id = folder.id;
        if folder_id == ZERO_ID || inner.contains(&folder_id) {
            debug!(folder_id = %folder_id, "Skipping duplicate folder in cache");
            continue;
        }
        folder.parent_id = parent_id;
        folder.children = Vec::new();
        inner.link(InventoryNode::Folder(folder));
        restored += 1;

        for mut item in cached.items {
            item.parent_id = folder_id;
            inner.link(InventoryNode::Item(item));
            restored += 1;
        }
        for sub in cached.folders {
            stack.push((folder_id, sub));
        }
    }

    restored
}
