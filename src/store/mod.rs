//! Inventory Node Store
//!
//! Canonical in-memory mirror of the inventory tree. Folders and items live in
//! two disjoint id indices; parent links are ids looked up in those indices.
//! A node whose declared parent is not yet known waits in the unresolved index,
//! keyed by the missing parent id, and becomes visible when that parent arrives.

pub mod persistence;

use crate::error::StorageError;
use crate::inventory::{InventoryFolder, InventoryItem, InventoryNode};
use crate::types::{AgentID, FolderID, ItemID, ZERO_ID};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Result of inserting a node into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Node was not known before and is now linked and indexed
    Inserted,
    /// Node replaced an existing resolved entry
    Updated,
    /// Parent is unknown; node waits in the unresolved index
    Deferred,
    /// Node cannot be placed (root replacement or self-parenting)
    Rejected,
}

/// Tree state guarded by the store lock
#[derive(Debug)]
pub struct StoreInner {
    folders: HashMap<FolderID, InventoryFolder>,
    items: HashMap<ItemID, InventoryItem>,
    /// Missing parent id -> nodes waiting for it
    unresolved: HashMap<FolderID, Vec<InventoryNode>>,
    /// Waiting node id -> missing parent id it waits under
    waiting_on: HashMap<Uuid, FolderID>,
}

impl Default for StoreInner {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    pub fn new() -> Self {
        let mut folders = HashMap::new();
        folders.insert(ZERO_ID, InventoryFolder::root());
        Self {
            folders,
            items: HashMap::new(),
            unresolved: HashMap::new(),
            waiting_on: HashMap::new(),
        }
    }

    /// Insert or relink a node
    ///
    /// A re-upserted folder keeps its linked children. Inserting a folder
    /// resolves every node waiting on its id, transitively.
    pub fn add(&mut self, mut node: InventoryNode) -> AddOutcome {
        let id = node.id();
        let parent_id = node.parent_id();

        if id == ZERO_ID {
            warn!("Refusing to replace the inventory root");
            return AddOutcome::Rejected;
        }
        if id == parent_id {
            warn!(node_id = %id, "Refusing to parent a node under itself");
            return AddOutcome::Rejected;
        }

        self.drop_waiting(id);

        let previous_parent = self.resolved_parent(id);
        let existed = previous_parent.is_some();

        if let InventoryNode::Folder(folder) = &mut node {
            if let Some(old) = self.folders.get(&id) {
                folder.children = old.children.clone();
            }
        }

        if previous_parent == Some(parent_id) {
            self.insert_indexed(node);
            return AddOutcome::Updated;
        }

        if let Some(old_parent) = previous_parent {
            self.unlink(id, old_parent);
            self.folders.remove(&id);
            self.items.remove(&id);
        }

        if !self.folders.contains_key(&parent_id) {
            debug!(node_id = %id, parent_id = %parent_id, "Parent unknown, deferring node");
            if let InventoryNode::Folder(folder) = &mut node {
                self.defer_descendants(folder);
            }
            self.waiting_on.insert(id, parent_id);
            self.unresolved.entry(parent_id).or_default().push(node);
            return AddOutcome::Deferred;
        }

        let is_folder = node.is_folder();
        self.link(node);
        if is_folder {
            self.resolve_waiting(id);
        }

        if existed {
            AddOutcome::Updated
        } else {
            AddOutcome::Inserted
        }
    }

    /// Insert a node under an explicit parent
    pub fn add_under(&mut self, parent_id: FolderID, mut node: InventoryNode) -> AddOutcome {
        node.set_parent_id(parent_id);
        self.add(node)
    }

    /// Remove a node; folders take their whole subtree with them
    ///
    /// Nodes still waiting on an unknown parent are removed too, along with
    /// everything waiting below them. Returns the number of nodes removed.
    pub fn remove(&mut self, id: Uuid) -> usize {
        if id == ZERO_ID {
            warn!("Refusing to remove the inventory root");
            return 0;
        }

        if self.drop_waiting(id) {
            let removed = 1 + self.purge_waiting_below(id);
            debug!(node_id = %id, removed, "Removed unresolved inventory subtree");
            return removed;
        }

        let Some(parent_id) = self.resolved_parent(id) else {
            return 0;
        };
        self.unlink(id, parent_id);

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            if let Some(folder) = self.folders.remove(&node_id) {
                stack.extend(folder.children);
                removed += 1 + self.purge_waiting_below(node_id);
            } else if self.items.remove(&node_id).is_some() {
                removed += 1;
            }
        }

        debug!(node_id = %id, removed, "Removed inventory subtree");
        removed
    }

    pub fn get_item(&self, id: &ItemID) -> Option<&InventoryItem> {
        self.items.get(id)
    }

    pub fn get_folder(&self, id: &FolderID) -> Option<&InventoryFolder> {
        self.folders.get(id)
    }

    pub fn get_folder_mut(&mut self, id: &FolderID) -> Option<&mut InventoryFolder> {
        self.folders.get_mut(id)
    }

    pub fn get_node(&self, id: &Uuid) -> Option<InventoryNode> {
        if let Some(folder) = self.folders.get(id) {
            return Some(InventoryNode::Folder(folder.clone()));
        }
        self.items.get(id).map(|item| InventoryNode::Item(item.clone()))
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.folders.contains_key(id) || self.items.contains_key(id)
    }

    pub fn contains_folder(&self, id: &FolderID) -> bool {
        self.folders.contains_key(id)
    }

    pub fn contains_item(&self, id: &ItemID) -> bool {
        self.items.contains_key(id)
    }

    /// Snapshot of a resolved folder's children, in link order
    pub fn get_contents(&self, folder_id: &FolderID) -> Result<Vec<InventoryNode>, StorageError> {
        let folder = self
            .folders
            .get(folder_id)
            .ok_or(StorageError::UnknownFolder(*folder_id))?;
        Ok(folder
            .children
            .iter()
            .filter_map(|child| self.get_node(child))
            .collect())
    }

    /// Apply a server version to a folder unless it is older than the current one
    ///
    /// Returns false when the folder is unknown or the update is stale.
    pub fn update_folder_version(
        &mut self,
        folder_id: &FolderID,
        version: i32,
        descendent_count: i32,
    ) -> bool {
        let Some(folder) = self.folders.get_mut(folder_id) else {
            return false;
        };
        if version < folder.version {
            return false;
        }
        folder.version = version;
        folder.descendent_count = descendent_count;
        folder.needs_update = false;
        true
    }

    /// Number of resolved nodes, excluding the root
    pub fn len(&self) -> usize {
        self.folders.len() + self.items.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes waiting on an unknown parent
    pub fn unresolved_len(&self) -> usize {
        self.waiting_on.len()
    }

    /// Clone every resolved item
    pub fn items(&self) -> Vec<InventoryItem> {
        self.items.values().cloned().collect()
    }

    /// Drop every node except the root
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Depth-first name match of `path` below `base`
    ///
    /// Intermediate segments only match folders.
    pub fn find_by_path(&self, base: FolderID, path: &[&str], first_only: bool) -> Vec<InventoryNode> {
        let mut found = Vec::new();
        if !path.is_empty() {
            self.find_from(base, path, 0, first_only, &mut found);
        }
        found
    }

    fn find_from(
        &self,
        folder: FolderID,
        path: &[&str],
        level: usize,
        first_only: bool,
        found: &mut Vec<InventoryNode>,
    ) {
        let Ok(contents) = self.get_contents(&folder) else {
            return;
        };
        for node in contents {
            if node.name() != path[level] {
                continue;
            }
            if level + 1 == path.len() {
                found.push(node);
                if first_only {
                    return;
                }
            } else if node.is_folder() {
                self.find_from(node.id(), path, level + 1, first_only, found);
                if first_only && !found.is_empty() {
                    return;
                }
            }
        }
    }

    fn resolved_parent(&self, id: Uuid) -> Option<FolderID> {
        if let Some(folder) = self.folders.get(&id) {
            return Some(folder.parent_id);
        }
        self.items.get(&id).map(|item| item.parent_id)
    }

    fn insert_indexed(&mut self, node: InventoryNode) {
        match node {
            InventoryNode::Folder(folder) => {
                self.items.remove(&folder.id);
                self.folders.insert(folder.id, folder);
            }
            InventoryNode::Item(item) => {
                self.folders.remove(&item.id);
                self.items.insert(item.id, item);
            }
        }
    }

    /// Link a node under its declared parent, which must be indexed
    pub(crate) fn link(&mut self, node: InventoryNode) {
        let id = node.id();
        if let Some(parent) = self.folders.get_mut(&node.parent_id()) {
            if !parent.children.contains(&id) {
                parent.children.push(id);
            }
        }
        self.insert_indexed(node);
    }

    fn unlink(&mut self, id: Uuid, parent_id: FolderID) {
        if let Some(parent) = self.folders.get_mut(&parent_id) {
            parent.children.retain(|child| *child != id);
        }
    }

    /// Take a node out of the unresolved index; false if it was not waiting
    fn drop_waiting(&mut self, id: Uuid) -> bool {
        let Some(parent_id) = self.waiting_on.remove(&id) else {
            return false;
        };
        if let Some(waiting) = self.unresolved.get_mut(&parent_id) {
            waiting.retain(|node| node.id() != id);
            if waiting.is_empty() {
                self.unresolved.remove(&parent_id);
            }
        }
        true
    }

    /// Drop every node waiting under `folder_id`, transitively
    fn purge_waiting_below(&mut self, folder_id: FolderID) -> usize {
        let mut purged = 0;
        let mut stack = vec![folder_id];
        while let Some(parent_id) = stack.pop() {
            let Some(waiting) = self.unresolved.remove(&parent_id) else {
                continue;
            };
            for node in waiting {
                self.waiting_on.remove(&node.id());
                if node.is_folder() {
                    stack.push(node.id());
                }
                purged += 1;
            }
        }
        purged
    }

    /// Move a folder's indexed subtree into the unresolved index
    ///
    /// Each node waits under its own parent, so resolving `folder` later
    /// relinks the whole subtree.
    fn defer_descendants(&mut self, folder: &mut InventoryFolder) {
        let mut stack = vec![(folder.id, std::mem::take(&mut folder.children))];
        while let Some((parent_id, children)) = stack.pop() {
            for child_id in children {
                let node = if let Some(mut sub) = self.folders.remove(&child_id) {
                    stack.push((child_id, std::mem::take(&mut sub.children)));
                    InventoryNode::Folder(sub)
                } else if let Some(item) = self.items.remove(&child_id) {
                    InventoryNode::Item(item)
                } else {
                    continue;
                };
                self.waiting_on.insert(child_id, parent_id);
                self.unresolved.entry(parent_id).or_default().push(node);
            }
        }
    }

    fn resolve_waiting(&mut self, folder_id: FolderID) {
        let mut stack = vec![folder_id];
        while let Some(parent_id) = stack.pop() {
            let Some(waiting) = self.unresolved.remove(&parent_id) else {
                continue;
            };
            for node in waiting {
                let id = node.id();
                self.waiting_on.remove(&id);
                if node.is_folder() {
                    stack.push(id);
                }
                self.link(node);
            }
            debug!(parent_id = %parent_id, "Resolved waiting inventory nodes");
        }
    }
}

/// Thread-safe inventory store for one owner
pub struct InventoryStore {
    owner: AgentID,
    inner: RwLock<StoreInner>,
}

impl InventoryStore {
    pub fn new(owner: AgentID) -> Self {
        Self {
            owner,
            inner: RwLock::new(StoreInner::new()),
        }
    }

    pub fn owner(&self) -> AgentID {
        self.owner
    }

    /// Shared access for multi-step reads
    pub fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read()
    }

    /// Exclusive access for multi-step updates applied atomically
    pub fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write()
    }

    pub fn add(&self, node: impl Into<InventoryNode>) -> AddOutcome {
        self.inner.write().add(node.into())
    }

    pub fn add_under(&self, parent_id: FolderID, node: impl Into<InventoryNode>) -> AddOutcome {
        self.inner.write().add_under(parent_id, node.into())
    }

    pub fn remove(&self, id: Uuid) -> usize {
        self.inner.write().remove(id)
    }

    pub fn get_item(&self, id: &ItemID) -> Option<InventoryItem> {
        self.inner.read().get_item(id).cloned()
    }

    pub fn get_folder(&self, id: &FolderID) -> Option<InventoryFolder> {
        self.inner.read().get_folder(id).cloned()
    }

    pub fn get_node(&self, id: &Uuid) -> Option<InventoryNode> {
        self.inner.read().get_node(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.read().contains(id)
    }

    pub fn contains_folder(&self, id: &FolderID) -> bool {
        self.inner.read().contains_folder(id)
    }

    pub fn contains_item(&self, id: &ItemID) -> bool {
        self.inner.read().contains_item(id)
    }

    pub fn get_contents(&self, folder_id: &FolderID) -> Result<Vec<InventoryNode>, StorageError> {
        self.inner.read().get_contents(folder_id)
    }

    /// The synthetic all-zero root folder
    pub fn root(&self) -> InventoryFolder {
        self.inner
            .read()
            .get_folder(&ZERO_ID)
            .cloned()
            .unwrap_or_else(InventoryFolder::root)
    }

    pub fn items(&self) -> Vec<InventoryItem> {
        self.inner.read().items()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
