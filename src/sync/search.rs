//! Path lookups, remote and cached.

use super::rendezvous::Rendezvous;
use super::InventoryManager;
use crate::error::InventoryError;
use crate::events::InventoryEvent;
use crate::inventory::{AssetType, InventoryNode, SortOrder};
use crate::store::StoreInner;
use crate::types::{AgentID, FolderID};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// In-flight remote path lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct InventorySearch {
    /// Folder whose listing is awaited
    pub folder: FolderID,
    pub owner: AgentID,
    pub path: Vec<String>,
    /// Index of the path segment to match in `folder`
    pub level: usize,
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

impl InventoryManager {
    /// Start resolving a slash-separated path below `base_folder`
    ///
    /// The result arrives as `FindObjectByPathReply`.
    pub fn request_find_object_by_path(
        &self,
        base_folder: FolderID,
        owner_id: AgentID,
        path: &str,
    ) -> Result<(), InventoryError> {
        let segments = split_path(path);
        if segments.is_empty() {
            return Err(InventoryError::InvalidArgument(
                "empty inventory path".to_string(),
            ));
        }

        self.shared.searches.lock().push(InventorySearch {
            folder: base_folder,
            owner: owner_id,
            path: segments,
            level: 0,
        });
        self.request_folder_contents(base_folder, owner_id, true, true, SortOrder::BY_NAME)
    }

    /// Resolve a path remotely, waiting up to `timeout`
    pub fn find_object_by_path(
        &self,
        base_folder: FolderID,
        owner_id: AgentID,
        path: &str,
        timeout: Duration,
    ) -> Option<Uuid> {
        let wanted = split_path(path).join("/");
        let rendezvous = Rendezvous::new();
        let setter = rendezvous.setter();
        let _subscription = self.subscribe(move |event| {
            if let InventoryEvent::FindObjectByPathReply { path, object_id } = event {
                if *path == wanted {
                    setter.set(*object_id);
                }
            }
        });

        if let Err(e) = self.request_find_object_by_path(base_folder, owner_id, path) {
            warn!(path = %path, error = %e, "Path search not started");
            return None;
        }
        rendezvous.wait(timeout)
    }

    /// Depth-first name match over already cached folders
    pub fn local_find(&self, base_folder: FolderID, path: &[&str], first_only: bool) -> Vec<InventoryNode> {
        self.shared.store.read().find_by_path(base_folder, path, first_only)
    }

    /// Top-level folder of the agent's inventory preferring `asset_type`
    ///
    /// Falls back to the inventory root.
    pub fn find_folder_for_type(&self, asset_type: AssetType) -> FolderID {
        let root = self.shared.session.inventory_root;
        if asset_type == AssetType::Folder {
            return root;
        }
        let store = self.shared.store.read();
        folder_for_type_in(&store, root, asset_type)
    }

    /// Advance searches waiting on `folder_id` after its listing arrived
    pub(super) fn advance_searches(&self, folder_id: FolderID) {
        let contents = match self.shared.store.get_contents(&folder_id) {
            Ok(contents) => contents,
            Err(_) => return,
        };

        let mut replies = Vec::new();
        let mut deeper = Vec::new();
        {
            let mut searches = self.shared.searches.lock();
            searches.retain_mut(|search| {
                if search.folder != folder_id {
                    return true;
                }
                let Some(segment) = search.path.get(search.level) else {
                    return false;
                };
                let last = search.level + 1 == search.path.len();
                let matched = contents
                    .iter()
                    .find(|node| node.name() == segment.as_str() && (last || node.is_folder()));
                let Some(node) = matched else {
                    return true;
                };

                if last {
                    replies.push(InventoryEvent::FindObjectByPathReply {
                        path: search.path.join("/"),
                        object_id: node.id(),
                    });
                    false
                } else {
                    search.level += 1;
                    search.folder = node.id();
                    debug!(folder_id = %search.folder, level = search.level, "Path search descending");
                    deeper.push((search.folder, search.owner));
                    true
                }
            });
        }

        for (folder, owner) in deeper {
            if let Err(e) = self.request_folder_contents(folder, owner, true, true, SortOrder::BY_NAME) {
                warn!(folder_id = %folder, error = %e, "Path search fetch failed");
            }
        }
        self.emit_all(replies);
    }

    /// Path searches still waiting on a folder listing
    pub fn pending_searches(&self) -> usize {
        self.shared.searches.lock().len()
    }
}

pub(super) fn folder_for_type_in(store: &StoreInner, root: FolderID, asset_type: AssetType) -> FolderID {
    store
        .get_contents(&root)
        .ok()
        .and_then(|contents| {
            contents.into_iter().find_map(|node| match node {
                InventoryNode::Folder(folder) if folder.preferred_type == asset_type => Some(folder.id),
                _ => None,
            })
        })
        .unwrap_or(root)
}
