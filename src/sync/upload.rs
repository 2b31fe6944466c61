//! Capability upload exchanges.
//!
//! Every upload starts with a metadata POST. The server answers with
//! `state = "upload"` and an uploader URL, which receives the asset bytes and
//! answers in the same shape, or with `state = "complete"`. Any other state is
//! a failure. There is no retry bound; the exchange continues for as long as
//! the server keeps asking for uploads.

use super::InventoryManager;
use crate::error::InventoryError;
use crate::inventory::{AssetType, InventoryType, Permissions};
use crate::protocol::osd::{self, UploadReply};
use crate::transport::{HttpOutcome, RequestBody};
use crate::types::{FolderID, ItemID};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

const NEW_FILE_AGENT_INVENTORY: &str = "NewFileAgentInventory";
const UPDATE_NOTECARD_AGENT: &str = "UpdateNotecardAgentInventory";
const UPDATE_NOTECARD_TASK: &str = "UpdateNotecardTaskInventory";
const UPDATE_SCRIPT_AGENT: &str = "UpdateScriptAgent";
const UPDATE_SCRIPT_TASK: &str = "UpdateScriptTask";

/// Final state of an upload exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    /// "complete" on success, otherwise the failure reason
    pub status: String,
    pub item_id: Option<ItemID>,
    pub asset_id: Option<Uuid>,
    /// Script uploads only
    pub compiled: Option<bool>,
    pub errors: Vec<String>,
}

impl UploadResult {
    fn failed(status: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            item_id: None,
            asset_id: None,
            compiled: None,
            errors: Vec::new(),
        }
    }
}

pub type UploadCallback = Box<dyn FnOnce(UploadResult) + Send + 'static>;

#[derive(Debug, Clone, Copy)]
enum UploadTarget {
    /// New agent item; the server names it on completion
    NewItem,
    /// Existing agent item; refreshed after completion
    AgentItem(ItemID),
    /// Item inside an object; the store does not mirror it
    TaskItem(ItemID),
}

#[derive(Clone)]
struct UploadExchange {
    manager: InventoryManager,
    data: Arc<Vec<u8>>,
    target: UploadTarget,
    on_done: Arc<Mutex<Option<UploadCallback>>>,
}

impl UploadExchange {
    fn finish(&self, result: UploadResult) {
        if !result.success {
            warn!(status = %result.status, "Upload failed");
        }
        if let Some(callback) = self.on_done.lock().take() {
            callback(result);
        }
    }

    fn post(&self, url: &str, body: RequestBody) {
        let exchange = self.clone();
        let on_result = Box::new(move |outcome: HttpOutcome| exchange.handle(outcome));
        if let Err(e) = self.manager.post(url, body, on_result) {
            self.finish(UploadResult::failed(e.to_string()));
        }
    }

    fn handle(self, outcome: HttpOutcome) {
        let reply = match outcome {
            HttpOutcome::Completed(value) => match osd::decode::<UploadReply>(value) {
                Ok(reply) => reply,
                Err(e) => {
                    error!(error = %e, "Malformed upload reply");
                    return self.finish(UploadResult::failed(e.to_string()));
                }
            },
            HttpOutcome::Failed(reason) => return self.finish(UploadResult::failed(reason)),
            HttpOutcome::Cancelled => return self.finish(UploadResult::failed("request cancelled")),
        };

        match reply.state.as_str() {
            "upload" => match reply.uploader.as_deref() {
                Some(uploader) => {
                    debug!(uploader = %uploader, bytes = self.data.len(), "Uploading asset data");
                    self.post(uploader, RequestBody::Bytes(self.data.as_ref().clone()));
                }
                None => self.finish(UploadResult::failed("upload reply without uploader")),
            },
            "complete" => self.complete(reply),
            other => self.finish(UploadResult::failed(other)),
        }
    }

    fn complete(&self, reply: UploadReply) {
        let item_id = match self.target {
            UploadTarget::NewItem => reply.new_inventory_item,
            UploadTarget::AgentItem(id) | UploadTarget::TaskItem(id) => Some(id),
        };
        let (Some(asset_id), Some(item_id)) = (reply.new_asset, item_id) else {
            return self.finish(UploadResult::failed(
                "upload completed without asset or item id",
            ));
        };

        if !matches!(self.target, UploadTarget::TaskItem(_)) {
            let owner = self.manager.agent_id();
            if let Err(e) = self.manager.request_fetch_inventory(&[item_id], &[owner]) {
                warn!(item_id = %item_id, error = %e, "Could not refresh uploaded item");
            }
        }

        self.finish(UploadResult {
            success: true,
            status: reply.state,
            item_id: Some(item_id),
            asset_id: Some(asset_id),
            compiled: reply.compiled,
            errors: reply.errors,
        });
    }
}

impl InventoryManager {
    fn start_upload(
        &self,
        capability: &str,
        metadata: Value,
        data: Vec<u8>,
        target: UploadTarget,
        callback: UploadCallback,
    ) -> Result<(), InventoryError> {
        let exchange = UploadExchange {
            manager: self.clone(),
            data: Arc::new(data),
            target,
            on_done: Arc::new(Mutex::new(Some(callback))),
        };
        match self.shared.transports.capabilities.capability_uri(capability) {
            Some(url) => exchange.post(&url, RequestBody::Osd(metadata)),
            None => exchange.finish(UploadResult::failed(format!(
                "{} capability is not currently available",
                capability
            ))),
        }
        Ok(())
    }

    /// Upload an asset and create an agent item for it
    #[allow(clippy::too_many_arguments)]
    pub fn request_create_item_from_asset(
        &self,
        data: Vec<u8>,
        name: &str,
        description: &str,
        asset_type: AssetType,
        inventory_type: InventoryType,
        folder_id: FolderID,
        permissions: &Permissions,
        callback: UploadCallback,
    ) -> Result<(), InventoryError> {
        let metadata = json!({
            "folder_id": folder_id,
            "asset_type": asset_type.name(),
            "inventory_type": inventory_type.name(),
            "name": name,
            "description": description,
            "everyone_mask": permissions.everyone_mask,
            "group_mask": permissions.group_mask,
            "next_owner_mask": permissions.next_owner_mask,
        });
        self.start_upload(
            NEW_FILE_AGENT_INVENTORY,
            metadata,
            data,
            UploadTarget::NewItem,
            callback,
        )
    }

    /// Replace the text of a notecard in agent inventory
    pub fn request_upload_notecard_asset(
        &self,
        data: Vec<u8>,
        notecard_id: ItemID,
        callback: UploadCallback,
    ) -> Result<(), InventoryError> {
        self.start_upload(
            UPDATE_NOTECARD_AGENT,
            json!({ "item_id": notecard_id }),
            data,
            UploadTarget::AgentItem(notecard_id),
            callback,
        )
    }

    /// Replace the text of a notecard inside an object
    pub fn request_update_notecard_task(
        &self,
        data: Vec<u8>,
        notecard_id: ItemID,
        task_id: Uuid,
        callback: UploadCallback,
    ) -> Result<(), InventoryError> {
        self.start_upload(
            UPDATE_NOTECARD_TASK,
            json!({ "item_id": notecard_id, "task_id": task_id }),
            data,
            UploadTarget::TaskItem(notecard_id),
            callback,
        )
    }

    /// Replace script source in agent inventory; the result reports compilation
    pub fn request_update_script_agent_inventory(
        &self,
        data: Vec<u8>,
        item_id: ItemID,
        mono: bool,
        callback: UploadCallback,
    ) -> Result<(), InventoryError> {
        self.start_upload(
            UPDATE_SCRIPT_AGENT,
            json!({ "item_id": item_id, "target": script_target(mono) }),
            data,
            UploadTarget::AgentItem(item_id),
            callback,
        )
    }

    /// Replace script source inside an object
    pub fn request_update_script_task(
        &self,
        data: Vec<u8>,
        item_id: ItemID,
        task_id: Uuid,
        mono: bool,
        running: bool,
        callback: UploadCallback,
    ) -> Result<(), InventoryError> {
        self.start_upload(
            UPDATE_SCRIPT_TASK,
            json!({
                "item_id": item_id,
                "task_id": task_id,
                "is_script_running": running,
                "target": script_target(mono),
            }),
            data,
            UploadTarget::TaskItem(item_id),
            callback,
        )
    }
}

fn script_target(mono: bool) -> &'static str {
    if mono {
        "mono"
    } else {
        "lsl2"
    }
}
