//! Inventory offers to other agents.
//!
//! An offer is an instant message whose binary bucket lists 17-byte entries:
//! the asset type code followed by the 16 id bytes. Items the giver cannot
//! copy leave the giver's store once offered.

use super::InventoryManager;
use crate::error::InventoryError;
use crate::inventory::{AssetType, InventoryItem, SortOrder};
use crate::protocol::{OutgoingMessage, IM_INVENTORY_OFFERED};
use crate::types::{AgentID, FolderID, ItemID};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Size of one offer bucket entry
pub const BUCKET_ENTRY_LEN: usize = 17;

fn push_entry(bucket: &mut Vec<u8>, asset_type: AssetType, id: &Uuid) {
    bucket.push(asset_type.code() as u8);
    bucket.extend_from_slice(id.as_bytes());
}

impl InventoryManager {
    /// Offer a single item
    pub fn give_item(
        &self,
        item_id: ItemID,
        item_name: &str,
        asset_type: AssetType,
        recipient: AgentID,
    ) -> Result<(), InventoryError> {
        let mut bucket = Vec::with_capacity(BUCKET_ENTRY_LEN);
        push_entry(&mut bucket, asset_type, &item_id);
        self.send_offer(recipient, item_name, bucket)?;

        if let Some(item) = self.shared.store.get_item(&item_id) {
            self.forget_if_no_copy(&item);
        }
        Ok(())
    }

    /// Offer a folder and the items directly inside it
    ///
    /// Blocks on a folder listing and then on one fetch per item, so this must
    /// not be called from a transport callback. Returns false when the
    /// listing timed out and nothing was offered.
    pub fn give_folder(
        &self,
        folder_id: FolderID,
        folder_name: &str,
        asset_type: AssetType,
        recipient: AgentID,
    ) -> Result<bool, InventoryError> {
        let agent_id = self.agent_id();
        let Some(contents) = self.folder_contents(
            folder_id,
            agent_id,
            false,
            true,
            SortOrder::BY_DATE,
            self.shared.config.give_folder_timeout(),
        ) else {
            warn!(folder_id = %folder_id, "Folder listing timed out, offer not sent");
            return Ok(false);
        };

        let mut items: Vec<InventoryItem> = Vec::new();
        for node in contents.iter().filter(|node| !node.is_folder()) {
            match self.fetch_item(node.id(), agent_id, self.shared.config.give_item_timeout()) {
                Some(item) => items.push(item),
                None => warn!(item_id = %node.id(), "Item fetch timed out, leaving it out of the offer"),
            }
        }

        let mut bucket = Vec::with_capacity(BUCKET_ENTRY_LEN * (items.len() + 1));
        push_entry(&mut bucket, asset_type, &folder_id);
        for item in &items {
            push_entry(&mut bucket, item.asset_type, &item.id);
        }
        debug!(folder_id = %folder_id, items = items.len(), "Offering folder");
        self.send_offer(recipient, folder_name, bucket)?;

        for item in &items {
            self.forget_if_no_copy(item);
        }
        Ok(true)
    }

    fn send_offer(&self, recipient: AgentID, name: &str, bucket: Vec<u8>) -> Result<(), InventoryError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        info!(recipient = %recipient, name = %name, "Sending inventory offer");
        self.send(OutgoingMessage::ImprovedInstantMessage {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            to_agent_id: recipient,
            id: Uuid::new_v4(),
            dialog: IM_INVENTORY_OFFERED,
            from_agent_name: self.shared.session.agent_name.clone(),
            message: name.to_string(),
            binary_bucket: bucket,
            timestamp,
        })
    }

    fn forget_if_no_copy(&self, item: &InventoryItem) {
        if !item.permissions.owner_can_copy() {
            self.shared.store.remove(item.id);
        }
    }
}
