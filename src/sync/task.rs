//! Object ("task") inventory requests.

use super::rendezvous::{deadline_after, Rendezvous};
use super::InventoryManager;
use crate::error::InventoryError;
use crate::events::InventoryEvent;
use crate::inventory::{InventoryItem, InventoryNode};
use crate::protocol::{ItemBlock, OutgoingMessage};
use crate::task_inventory::parse_task_inventory;
use crate::types::{FolderID, ItemID, LocalID, ZERO_ID};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

impl InventoryManager {
    /// Ask the simulator for an object's inventory listing
    ///
    /// The reply arrives as `TaskInventoryReply`.
    pub fn request_task_inventory(&self, object_local_id: LocalID) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::RequestTaskInventory {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            object_local_id,
        })
    }

    /// Fetch and parse an object's inventory, waiting up to `timeout` overall
    ///
    /// An object with no inventory yields an empty list.
    pub fn get_task_inventory(
        &self,
        object_id: Uuid,
        object_local_id: LocalID,
        timeout: Duration,
    ) -> Option<Vec<InventoryNode>> {
        let deadline = deadline_after(timeout);

        let reply: Rendezvous<String> = Rendezvous::new();
        let setter = reply.setter();
        let subscription = self.subscribe(move |event| {
            if let InventoryEvent::TaskInventoryReply {
                item_id,
                asset_filename,
                ..
            } = event
            {
                if *item_id == object_id {
                    setter.set(asset_filename.clone());
                }
            }
        });

        if let Err(e) = self.request_task_inventory(object_local_id) {
            warn!(object_id = %object_id, error = %e, "Task inventory request failed");
            return None;
        }
        let filename = reply.wait_until(deadline);
        drop(subscription);

        let filename = filename?;
        if filename.is_empty() {
            debug!(object_id = %object_id, "Object has no inventory");
            return Some(Vec::new());
        }

        let download: Rendezvous<Option<Vec<u8>>> = Rendezvous::new();
        let setter = download.setter();
        let requested = self.shared.transports.task_files.request_file(
            &filename,
            Box::new(move |data: Option<Vec<u8>>| {
                setter.set(data);
            }),
        );
        if let Err(e) = requested {
            warn!(filename = %filename, error = %e, "Task inventory download not started");
            return None;
        }

        match download.wait_until(deadline)? {
            Some(bytes) => Some(parse_task_inventory(&String::from_utf8_lossy(&bytes))),
            None => {
                warn!(filename = %filename, "Task inventory download failed");
                None
            }
        }
    }

    /// Add or replace an item inside an object
    pub fn update_task_inventory(
        &self,
        object_local_id: LocalID,
        item: &InventoryItem,
    ) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::UpdateTaskInventory {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            object_local_id,
            item: ItemBlock::from_item(item, 0, ZERO_ID),
        })
    }

    pub fn remove_task_inventory(
        &self,
        object_local_id: LocalID,
        item_id: ItemID,
    ) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::RemoveTaskInventory {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            object_local_id,
            item_id,
        })
    }

    /// Copy an item out of an object into an agent folder
    pub fn move_task_inventory(
        &self,
        object_local_id: LocalID,
        item_id: ItemID,
        folder_id: FolderID,
    ) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::MoveTaskInventory {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            folder_id,
            object_local_id,
            item_id,
        })
    }

    /// Copy a script from agent inventory into an object
    pub fn copy_script_to_task(
        &self,
        object_local_id: LocalID,
        item: &InventoryItem,
        enable: bool,
    ) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::RezScript {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            group_id: ZERO_ID,
            enabled: enable,
            object_local_id,
            item: ItemBlock::from_item(item, 0, ZERO_ID),
        })
    }

    /// The reply arrives as `ScriptRunningReply`
    pub fn request_get_script_running(&self, object_id: Uuid, script_id: ItemID) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::GetScriptRunning {
            object_id,
            item_id: script_id,
        })
    }

    pub fn request_set_script_running(
        &self,
        object_id: Uuid,
        script_id: ItemID,
        running: bool,
    ) -> Result<(), InventoryError> {
        self.send(OutgoingMessage::SetScriptRunning {
            agent_id: self.agent_id(),
            session_id: self.session_id(),
            object_id,
            item_id: script_id,
            running,
        })
    }
}
