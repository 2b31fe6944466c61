//! Push handlers for server-initiated inventory messages.

use super::correlation::{ItemCopiedCallback, ItemCreatedCallback, NOTECARD_COPY_ID};
use super::search::folder_for_type_in;
use super::InventoryManager;
use crate::events::InventoryEvent;
use crate::inventory::{AssetType, InventoryItem, InventoryType};
use crate::protocol::{FolderBlock, IncomingMessage, ItemBlock, MoveItemBlock, OutgoingMessage};
use crate::store::StoreInner;
use crate::types::{AgentID, FolderID, ItemID, ZERO_ID};
use tracing::{debug, warn};
use uuid::Uuid;

/// Objects reported with a texture inventory type are attachments
pub(super) fn repair_item(mut item: InventoryItem) -> InventoryItem {
    if item.asset_type == AssetType::Object && item.inventory_type == InventoryType::Texture {
        debug!(item_id = %item.id, "Reclassifying object item as attachment");
        item.inventory_type = InventoryType::Attachment;
    }
    item
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemSource {
    Created,
    Bulk,
    Fetched,
}

impl InventoryManager {
    /// Apply one inbound datagram message
    pub fn handle_message(&self, message: IncomingMessage) {
        match message {
            IncomingMessage::InventoryDescendents {
                folder_id,
                owner_id,
                version,
                descendents,
                folders,
                items,
                ..
            } => self.on_inventory_descendents(folder_id, owner_id, version, descendents, folders, items),
            IncomingMessage::UpdateCreateInventoryItem { items, .. } => {
                self.on_item_blocks(items, ItemSource::Created)
            }
            IncomingMessage::BulkUpdateInventory { folders, items, .. } => {
                self.on_bulk_folders(folders);
                self.on_item_blocks(items, ItemSource::Bulk);
            }
            IncomingMessage::MoveInventoryItem { items, .. } => self.on_items_moved(items),
            IncomingMessage::FetchInventoryReply { items, .. } => {
                self.on_item_blocks(items, ItemSource::Fetched)
            }
            IncomingMessage::ReplyTaskInventory {
                task_id,
                serial,
                filename,
            } => self.emit_all(vec![InventoryEvent::TaskInventoryReply {
                item_id: task_id,
                serial,
                asset_filename: filename,
            }]),
            IncomingMessage::ScriptRunningReply {
                object_id,
                item_id,
                running,
                mono,
            } => self.emit_all(vec![InventoryEvent::ScriptRunningReply {
                object_id,
                script_id: item_id,
                is_running: running,
                is_mono: mono,
            }]),
            IncomingMessage::SaveAssetIntoInventory {
                item_id,
                new_asset_id,
            } => self.on_asset_saved(item_id, new_asset_id),
            IncomingMessage::RemoveInventoryObjects {
                folder_ids,
                item_ids,
            } => self.on_objects_removed(folder_ids, item_ids),
        }
    }

    fn on_inventory_descendents(
        &self,
        folder_id: FolderID,
        owner_id: AgentID,
        version: i32,
        descendents: i32,
        folders: Vec<FolderBlock>,
        items: Vec<ItemBlock>,
    ) {
        {
            let mut store = self.shared.store.write();
            match store.get_folder(&folder_id) {
                None => {
                    warn!(folder_id = %folder_id, "Descendents for unknown folder");
                    return;
                }
                Some(folder) if version < folder.version => {
                    warn!(
                        folder_id = %folder_id,
                        version,
                        current = folder.version,
                        "Dropping outdated descendents packet"
                    );
                    return;
                }
                Some(_) => {}
            }
            store.update_folder_version(&folder_id, version, descendents);

            if descendents > 0 {
                for block in folders.iter().filter(|b| b.folder_id != ZERO_ID) {
                    if !store.contains_folder(&block.folder_id) {
                        store.add(block.to_folder(owner_id).into());
                    }
                }
                for block in items.iter().filter(|b| b.item_id != ZERO_ID) {
                    store.add(repair_item(block.to_item()).into());
                }
            }
        }

        self.advance_searches(folder_id);
        if self.folder_complete(&folder_id) {
            self.emit_all(vec![InventoryEvent::FolderUpdated {
                folder_id,
                success: true,
            }]);
        }
    }

    fn on_bulk_folders(&self, folders: Vec<FolderBlock>) {
        let agent_id = self.agent_id();
        let mut store = self.shared.store.write();
        for block in folders.iter().filter(|b| b.folder_id != ZERO_ID) {
            let folder = match store.get_folder(&block.folder_id) {
                Some(existing) => {
                    let mut folder = existing.clone();
                    folder.name = block.name.clone();
                    folder.parent_id = block.parent_id;
                    folder.preferred_type = AssetType::from_code(block.preferred_type);
                    folder
                }
                None => block.to_folder(agent_id),
            };
            store.add(folder.into());
        }
    }

    fn on_item_blocks(&self, blocks: Vec<ItemBlock>, source: ItemSource) {
        let mut events = Vec::new();
        let mut created: Vec<(ItemCreatedCallback, InventoryItem)> = Vec::new();
        let mut copied: Vec<(ItemCopiedCallback, InventoryItem)> = Vec::new();
        let mut reparented = Vec::new();

        {
            let mut store = self.shared.store.write();
            for block in blocks.iter().filter(|b| b.item_id != ZERO_ID) {
                if block.inv_type == InventoryType::Folder.code() {
                    warn!(item_id = %block.item_id, "Ignoring folder in item update");
                    continue;
                }

                let mut item = repair_item(block.to_item());
                if block.callback_id != 0 {
                    if let Some(inventory_type) = self.shared.callbacks.take_type_override(block.callback_id) {
                        item.inventory_type = inventory_type;
                    }
                }
                if item.parent_id == ZERO_ID && source != ItemSource::Fetched {
                    item.parent_id = self.default_folder_in(&store, item.asset_type);
                    debug!(item_id = %item.id, folder_id = %item.parent_id, "Assigned orphan item to default folder");
                    reparented.push(item.clone());
                }
                store.add(item.clone().into());

                if block.callback_id != NOTECARD_COPY_ID {
                    if let Some(callback) = self.shared.callbacks.take_created(block.callback_id) {
                        created.push((callback, item.clone()));
                    }
                }
                if block.callback_id != NOTECARD_COPY_ID || source != ItemSource::Fetched {
                    if let Some(callback) = self.shared.callbacks.take_copied(block.callback_id) {
                        copied.push((callback, item.clone()));
                    }
                }

                events.push(match source {
                    ItemSource::Created => InventoryEvent::TaskItemReceived {
                        item_id: item.id,
                        folder_id: block.folder_id,
                        creator_id: item.permissions.creator_id,
                        asset_id: item.asset_id,
                        inventory_type: item.inventory_type,
                    },
                    ItemSource::Bulk | ItemSource::Fetched => InventoryEvent::ItemReceived { item },
                });
            }
        }

        for (callback, item) in created {
            callback(true, Some(item));
        }
        for (callback, item) in copied {
            callback(item);
        }
        if !reparented.is_empty() {
            let items = reparented
                .iter()
                .map(|item| ItemBlock::from_item(item, 0, Uuid::nil()))
                .collect();
            self.send_all(vec![OutgoingMessage::UpdateInventoryItem {
                agent_id: self.agent_id(),
                session_id: self.session_id(),
                transaction_id: Uuid::nil(),
                items,
            }]);
        }
        self.emit_all(events);
    }

    fn on_items_moved(&self, blocks: Vec<MoveItemBlock>) {
        let mut events = Vec::new();
        {
            let mut store = self.shared.store.write();
            for block in blocks {
                let Some(existing) = store.get_item(&block.item_id) else {
                    debug!(item_id = %block.item_id, "Move for unknown item");
                    continue;
                };
                let mut item = existing.clone();
                item.parent_id = block.folder_id;
                if !block.new_name.is_empty() {
                    item.name = block.new_name;
                }
                store.add(item.clone().into());
                events.push(InventoryEvent::ItemReceived { item });
            }
        }
        self.emit_all(events);
    }

    fn on_asset_saved(&self, item_id: ItemID, new_asset_id: Uuid) {
        {
            let mut store = self.shared.store.write();
            if let Some(existing) = store.get_item(&item_id) {
                let mut item = existing.clone();
                item.asset_id = new_asset_id;
                store.add(item.into());
            }
        }
        self.emit_all(vec![InventoryEvent::SaveAssetToInventory {
            item_id,
            new_asset_id,
        }]);
    }

    fn on_objects_removed(&self, folder_ids: Vec<FolderID>, item_ids: Vec<ItemID>) {
        let mut store = self.shared.store.write();
        let removed: usize = folder_ids
            .into_iter()
            .chain(item_ids)
            .map(|id| store.remove(id))
            .sum();
        debug!(removed, "Server removed inventory objects");
    }

    fn default_folder_in(&self, store: &StoreInner, asset_type: AssetType) -> FolderID {
        let root = self.shared.session.inventory_root;
        if asset_type == AssetType::Folder {
            root
        } else {
            folder_for_type_in(store, root, asset_type)
        }
    }
}
