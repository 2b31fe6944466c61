//! Optimistic moves, copies, removals and creations.
//!
//! The store is changed before the request is sent and is never rolled back
//! if the server later disagrees; a fresher push from the server corrects it.

use super::correlation::{ItemCopiedCallback, ItemCreatedCallback};
use super::InventoryManager;
use crate::error::InventoryError;
use crate::inventory::{
    AssetType, InventoryFolder, InventoryItem, InventoryNode, InventoryType, WearableType,
};
use crate::protocol::{
    CopyItemBlock, DeRezDestination, FolderBlock, ItemBlock, MoveItemBlock, OutgoingMessage,
    RezData,
};
use crate::transport::{HttpOutcome, RequestBody, TransportPreference, TransportRoute};
use crate::types::{AgentID, FolderID, ItemID, LocalID, ZERO_ID};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

const COPY_FROM_NOTECARD: &str = "CopyInventoryFromNotecard";

impl InventoryManager {
    pub fn move_folder(&self, folder_id: FolderID, new_parent: FolderID) -> Result<(), InventoryError> {
        self.move_folders(&[(folder_id, new_parent)])
    }

    /// Move folders; each pair is (folder, new parent)
    pub fn move_folders(&self, moves: &[(FolderID, FolderID)]) -> Result<(), InventoryError> {
        if moves.is_empty() {
            return Ok(());
        }
        {
            let mut store = self.shared.store.write();
            for (folder_id, new_parent) in moves {
                if let Some(existing) = store.get_folder(folder_id) {
                    let mut folder = existing.clone();
                    folder.parent_id = *new_parent;
                    store.add(folder.into());
                }
            }
        }
        self.send(OutgoingMessage::MoveInventoryFolder {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            stamp: false,
            folders: moves.to_vec(),
        })
    }

    /// Rename, retype or reparent a folder
    pub fn update_folder_properties(
        &self,
        folder_id: FolderID,
        parent_id: FolderID,
        name: &str,
        preferred_type: AssetType,
    ) -> Result<(), InventoryError> {
        {
            let mut store = self.shared.store.write();
            if let Some(existing) = store.get_folder(&folder_id) {
                let mut folder = existing.clone();
                folder.parent_id = parent_id;
                folder.name = name.to_string();
                folder.preferred_type = preferred_type;
                store.add(folder.into());
            }
        }
        self.send(OutgoingMessage::UpdateInventoryFolder {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            folders: vec![FolderBlock {
                folder_id,
                parent_id,
                preferred_type: preferred_type.code(),
                name: name.to_string(),
            }],
        })
    }

    /// Move an item, optionally renaming it
    pub fn move_item(
        &self,
        item_id: ItemID,
        folder_id: FolderID,
        new_name: Option<&str>,
    ) -> Result<(), InventoryError> {
        self.move_item_blocks(vec![MoveItemBlock {
            item_id,
            folder_id,
            new_name: new_name.unwrap_or_default().to_string(),
        }])
    }

    /// Move items; each pair is (item, new folder)
    pub fn move_items(&self, moves: &[(ItemID, FolderID)]) -> Result<(), InventoryError> {
        self.move_item_blocks(
            moves
                .iter()
                .map(|(item_id, folder_id)| MoveItemBlock {
                    item_id: *item_id,
                    folder_id: *folder_id,
                    new_name: String::new(),
                })
                .collect(),
        )
    }

    fn move_item_blocks(&self, blocks: Vec<MoveItemBlock>) -> Result<(), InventoryError> {
        if blocks.is_empty() {
            return Ok(());
        }
        {
            let mut store = self.shared.store.write();
            for block in &blocks {
                if let Some(existing) = store.get_item(&block.item_id) {
                    let mut item = existing.clone();
                    item.parent_id = block.folder_id;
                    if !block.new_name.is_empty() {
                        item.name = block.new_name.clone();
                    }
                    store.add(item.into());
                }
            }
        }
        self.send(OutgoingMessage::MoveInventoryItem {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            stamp: false,
            items: blocks,
        })
    }

    /// Move whichever kind of node `node_id` names
    pub fn move_node(&self, node_id: Uuid, new_parent: FolderID) -> Result<(), InventoryError> {
        match self.shared.store.get_node(&node_id) {
            Some(InventoryNode::Folder(_)) => self.move_folder(node_id, new_parent),
            Some(InventoryNode::Item(_)) => self.move_item(node_id, new_parent, None),
            None => Err(InventoryError::InvalidArgument(format!(
                "unknown inventory node {}",
                node_id
            ))),
        }
    }

    pub fn remove_item(&self, item_id: ItemID) -> Result<(), InventoryError> {
        self.remove(&[item_id], &[])
    }

    pub fn remove_folder(&self, folder_id: FolderID) -> Result<(), InventoryError> {
        self.remove(&[], &[folder_id])
    }

    /// Remove items and folders, folders recursively
    pub fn remove(&self, item_ids: &[ItemID], folder_ids: &[FolderID]) -> Result<(), InventoryError> {
        if item_ids.is_empty() && folder_ids.is_empty() {
            return Ok(());
        }
        {
            let mut store = self.shared.store.write();
            for id in item_ids.iter().chain(folder_ids) {
                store.remove(*id);
            }
        }
        self.send(OutgoingMessage::RemoveInventoryObjects {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            folder_ids: folder_ids.to_vec(),
            item_ids: item_ids.to_vec(),
        })
    }

    /// Delete everything inside a folder, keeping the folder
    pub fn remove_descendants(&self, folder_id: FolderID) -> Result<(), InventoryError> {
        {
            let mut store = self.shared.store.write();
            if let Ok(contents) = store.get_contents(&folder_id) {
                for node in contents {
                    store.remove(node.id());
                }
            }
        }
        self.send(OutgoingMessage::PurgeInventoryDescendents {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            folder_id,
        })
    }

    pub fn empty_trash(&self) -> Result<(), InventoryError> {
        self.empty_system_folder(AssetType::TrashFolder)
    }

    pub fn empty_lost_and_found(&self) -> Result<(), InventoryError> {
        self.empty_system_folder(AssetType::LostAndFoundFolder)
    }

    fn empty_system_folder(&self, folder_type: AssetType) -> Result<(), InventoryError> {
        let folder_id = self.find_folder_for_type(folder_type);
        if folder_id == self.shared.session.inventory_root {
            warn!(folder_type = folder_type.name(), "No system folder of this type is cached");
            return Ok(());
        }

        let contents = self.shared.store.get_contents(&folder_id)?;
        let (folders, items): (Vec<InventoryNode>, Vec<InventoryNode>) =
            contents.into_iter().partition(InventoryNode::is_folder);
        let folder_ids: Vec<FolderID> = folders.iter().map(InventoryNode::id).collect();
        let item_ids: Vec<ItemID> = items.iter().map(InventoryNode::id).collect();
        debug!(folder_id = %folder_id, folders = folder_ids.len(), items = item_ids.len(), "Emptying system folder");
        self.remove(&item_ids, &folder_ids)
    }

    /// Create a folder locally and on the server
    ///
    /// An empty name is replaced by the default name for `preferred_type`.
    pub fn create_folder(
        &self,
        parent_id: FolderID,
        name: &str,
        preferred_type: AssetType,
    ) -> Result<FolderID, InventoryError> {
        if parent_id == ZERO_ID {
            return Err(InventoryError::InvalidArgument(
                "cannot create a folder under the zero id".to_string(),
            ));
        }
        let name = if name.is_empty() {
            preferred_type.default_folder_name()
        } else {
            name
        };

        let mut folder = InventoryFolder::new(Uuid::new_v4());
        folder.parent_id = parent_id;
        folder.owner_id = self.agent_id();
        folder.name = name.to_string();
        folder.preferred_type = preferred_type;
        folder.version = 1;
        folder.needs_update = false;
        let folder_id = folder.id;
        self.shared.store.add(folder);

        self.send(OutgoingMessage::CreateInventoryFolder {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            folder: FolderBlock {
                folder_id,
                parent_id,
                preferred_type: preferred_type.code(),
                name: name.to_string(),
            },
        })?;
        Ok(folder_id)
    }

    /// Ask the server to create an item; `callback` runs when it is confirmed
    ///
    /// Returns the correlation id echoed in the confirmation.
    #[allow(clippy::too_many_arguments)]
    pub fn request_create_item(
        &self,
        parent_folder: FolderID,
        name: &str,
        description: &str,
        asset_type: AssetType,
        transaction_id: Uuid,
        inventory_type: InventoryType,
        wearable_type: WearableType,
        next_owner_mask: u32,
        callback: ItemCreatedCallback,
    ) -> Result<u32, InventoryError> {
        let callback_id = self
            .shared
            .callbacks
            .register_created(callback, Some(inventory_type));
        let sent = self.send(OutgoingMessage::CreateInventoryItem {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            callback_id,
            folder_id: parent_folder,
            transaction_id,
            next_owner_mask,
            asset_type: asset_type.code(),
            inv_type: inventory_type.code(),
            wearable_type: wearable_type.code(),
            name: name.to_string(),
            description: description.to_string(),
        });
        if let Err(e) = sent {
            let _ = self.shared.callbacks.take_created(callback_id);
            let _ = self.shared.callbacks.take_type_override(callback_id);
            return Err(e);
        }
        Ok(callback_id)
    }

    pub fn request_update_item(&self, item: &InventoryItem) -> Result<(), InventoryError> {
        self.request_update_items(std::slice::from_ref(item), Uuid::new_v4())
    }

    /// Push local item edits; the store is updated first
    pub fn request_update_items(
        &self,
        items: &[InventoryItem],
        transaction_id: Uuid,
    ) -> Result<(), InventoryError> {
        if items.is_empty() {
            return Ok(());
        }
        {
            let mut store = self.shared.store.write();
            for item in items {
                store.add(item.clone().into());
            }
        }
        self.send(OutgoingMessage::UpdateInventoryItem {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            transaction_id,
            items: items
                .iter()
                .map(|item| ItemBlock::from_item(item, 0, transaction_id))
                .collect(),
        })
    }

    pub fn request_copy_item(
        &self,
        item_id: ItemID,
        new_parent: FolderID,
        new_name: &str,
        old_owner: AgentID,
        callback: ItemCopiedCallback,
    ) -> Result<u32, InventoryError> {
        self.request_copy_items(&[item_id], &[new_parent], &[new_name], old_owner, callback)
    }

    /// Copy items; the three slices are parallel and must be equally long
    ///
    /// One correlation id covers the batch, so `callback` sees the first copy
    /// the server echoes back.
    pub fn request_copy_items(
        &self,
        item_ids: &[ItemID],
        target_folders: &[FolderID],
        new_names: &[&str],
        old_owner: AgentID,
        callback: ItemCopiedCallback,
    ) -> Result<u32, InventoryError> {
        if item_ids.len() != target_folders.len() || item_ids.len() != new_names.len() {
            return Err(InventoryError::InvalidArgument(
                "copy requires equal numbers of items, folders and names".to_string(),
            ));
        }
        let callback_id = self.shared.callbacks.register_copied(callback);
        let items = item_ids
            .iter()
            .zip(target_folders)
            .zip(new_names)
            .map(|((item_id, folder_id), name)| CopyItemBlock {
                callback_id,
                old_agent_id: old_owner,
                old_item_id: *item_id,
                new_folder_id: *folder_id,
                new_name: name.to_string(),
            })
            .collect();
        let sent = self.send(OutgoingMessage::CopyInventoryItem {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            items,
        });
        if let Err(e) = sent {
            let _ = self.shared.callbacks.take_copied(callback_id);
            return Err(e);
        }
        Ok(callback_id)
    }

    /// Copy an item embedded in a notecard into agent inventory
    pub fn request_copy_item_from_notecard(
        &self,
        object_id: Uuid,
        notecard_id: ItemID,
        folder_id: FolderID,
        item_id: ItemID,
        callback: ItemCopiedCallback,
    ) -> Result<(), InventoryError> {
        let callback_id = self.shared.callbacks.register_notecard_copy(callback);
        let route = match self.route(COPY_FROM_NOTECARD, TransportPreference::Any) {
            TransportRoute::Http(url) => {
                let body = RequestBody::Osd(json!({
                    "notecard-id": notecard_id,
                    "object-id": object_id,
                    "item-id": item_id,
                    "folder-id": folder_id,
                    "callback-id": callback_id,
                }));
                let on_result = Box::new(|outcome: HttpOutcome| {
                    debug!(?outcome, "Copy from notecard acknowledged");
                });
                match self.post(&url, body, on_result) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        TransportRoute::after_http_failure(TransportPreference::Any, e.to_string())
                    }
                }
            }
            other => other,
        };
        debug!(?route, "Copying from notecard over datagram");
        let sent = self.send(OutgoingMessage::CopyInventoryFromNotecard {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            notecard_item_id: notecard_id,
            object_id,
            item_id,
            folder_id,
        });
        if sent.is_err() {
            let _ = self.shared.callbacks.take_copied(callback_id);
        }
        sent
    }

    /// Rez an inventory item in-world at `position`
    ///
    /// Returns the transaction id stamped on the request.
    pub fn request_rez_from_inventory(
        &self,
        position: [f32; 3],
        item: &InventoryItem,
        group_owner: AgentID,
        rez_selected: bool,
    ) -> Result<Uuid, InventoryError> {
        let transaction_id = Uuid::new_v4();
        let rez = RezData {
            from_task_id: ZERO_ID,
            bypass_raycast: true,
            ray_start: position,
            ray_end: position,
            ray_target_id: ZERO_ID,
            ray_end_is_intersection: false,
            rez_selected,
            remove_item: true,
            item_flags: item.flags,
            group_mask: item.permissions.group_mask,
            everyone_mask: item.permissions.everyone_mask,
            next_owner_mask: item.permissions.next_owner_mask,
        };
        self.send(OutgoingMessage::RezObject {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            group_id: group_owner,
            rez,
            item: ItemBlock::from_item(item, 0, transaction_id),
        })?;
        Ok(transaction_id)
    }

    /// Take an in-world object back into inventory
    pub fn request_derez_to_inventory(
        &self,
        object_local_id: LocalID,
        destination: DeRezDestination,
        destination_id: FolderID,
        transaction_id: Uuid,
    ) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::DeRezObject {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            group_id: ZERO_ID,
            destination: destination as u8,
            destination_id,
            transaction_id,
            local_ids: vec![object_local_id],
        })
    }
}
