//! Capability payloads.
//!
//! Capability requests and replies are structured documents (OSD); this crate
//! carries them as `serde_json::Value` and maps them to typed records here.

use crate::error::InventoryError;
use crate::inventory::{
    unix_to_datetime, AssetType, InventoryFolder, InventoryItem, InventoryType, Permissions,
    SaleType, SortOrder,
};
use crate::types::{AgentID, FolderID, ItemID};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Decode a capability reply, mapping shape errors to `MalformedPayload`
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, InventoryError> {
    serde_json::from_value(value).map_err(|e| InventoryError::MalformedPayload(e.to_string()))
}

/// One folder in a descendents fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderFetch {
    pub folder_id: FolderID,
    pub owner_id: AgentID,
    pub fetch_folders: bool,
    pub fetch_items: bool,
    pub sort_order: u32,
}

impl FolderFetch {
    pub fn new(
        folder_id: FolderID,
        owner_id: AgentID,
        fetch_folders: bool,
        fetch_items: bool,
        order: SortOrder,
    ) -> Self {
        Self {
            folder_id,
            owner_id,
            fetch_folders,
            fetch_items,
            sort_order: order.bits(),
        }
    }
}

pub fn fetch_descendents_request(folders: &[FolderFetch]) -> Value {
    json!({ "folders": folders })
}

pub fn fetch_items_request(agent_id: AgentID, items: &[(AgentID, ItemID)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(owner_id, item_id)| json!({ "owner_id": owner_id, "item_id": item_id }))
        .collect();
    json!({ "agent_id": agent_id, "items": items })
}

fn unknown_code() -> i8 {
    -1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsdPermissions {
    #[serde(default)]
    pub base_mask: u32,
    #[serde(default)]
    pub owner_mask: u32,
    #[serde(default)]
    pub group_mask: u32,
    #[serde(default)]
    pub everyone_mask: u32,
    #[serde(default)]
    pub next_owner_mask: u32,
    #[serde(default)]
    pub creator_id: Uuid,
    #[serde(default)]
    pub owner_id: Uuid,
    #[serde(default)]
    pub last_owner_id: Uuid,
    #[serde(default)]
    pub group_id: Uuid,
    #[serde(default)]
    pub is_owner_group: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsdSaleInfo {
    #[serde(default)]
    pub sale_type: u8,
    #[serde(default)]
    pub sale_price: i32,
}

/// Item as returned by fetch capabilities
#[derive(Debug, Clone, Deserialize)]
pub struct OsdItem {
    pub item_id: ItemID,
    pub parent_id: FolderID,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub asset_id: Uuid,
    #[serde(rename = "type", default = "unknown_code")]
    pub asset_type: i8,
    #[serde(default = "unknown_code")]
    pub inv_type: i8,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub sale_info: OsdSaleInfo,
    #[serde(default)]
    pub permissions: OsdPermissions,
    #[serde(default)]
    pub created_at: i64,
}

impl OsdItem {
    pub fn into_item(self) -> InventoryItem {
        let perms = self.permissions;
        let mut item = InventoryItem::new(self.item_id);
        item.parent_id = self.parent_id;
        item.owner_id = perms.owner_id;
        item.name = self.name;
        item.description = self.desc;
        item.asset_id = self.asset_id;
        item.asset_type = AssetType::from_code(self.asset_type);
        item.inventory_type = InventoryType::from_code(self.inv_type);
        item.flags = self.flags;
        item.sale_type = SaleType::from_code(self.sale_info.sale_type);
        item.sale_price = self.sale_info.sale_price;
        item.creation_date = unix_to_datetime(self.created_at);
        item.permissions = Permissions {
            base_mask: perms.base_mask,
            owner_mask: perms.owner_mask,
            group_mask: perms.group_mask,
            everyone_mask: perms.everyone_mask,
            next_owner_mask: perms.next_owner_mask,
            creator_id: perms.creator_id,
            owner_id: perms.owner_id,
            last_owner_id: perms.last_owner_id,
            group_id: perms.group_id,
            group_owned: perms.is_owner_group,
        };
        item
    }
}

/// Sub-folder as returned by the descendents capability
#[derive(Debug, Clone, Deserialize)]
pub struct OsdCategory {
    #[serde(alias = "folder_id")]
    pub category_id: FolderID,
    pub parent_id: FolderID,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type_default", default = "unknown_code")]
    pub preferred_type: i8,
    #[serde(default)]
    pub version: i32,
}

impl OsdCategory {
    pub fn into_folder(self, owner_id: AgentID) -> InventoryFolder {
        let mut folder = InventoryFolder::new(self.category_id);
        folder.parent_id = self.parent_id;
        folder.name = self.name;
        folder.preferred_type = AssetType::from_code(self.preferred_type);
        folder.version = self.version;
        folder.owner_id = owner_id;
        folder
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsdFolderContents {
    pub folder_id: FolderID,
    #[serde(default)]
    pub owner_id: AgentID,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub descendents: i32,
    #[serde(default)]
    pub categories: Vec<OsdCategory>,
    #[serde(default)]
    pub items: Vec<OsdItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsdBadFolder {
    pub folder_id: FolderID,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchDescendentsReply {
    #[serde(default)]
    pub folders: Vec<OsdFolderContents>,
    #[serde(default)]
    pub bad_folders: Vec<OsdBadFolder>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchItemsReply {
    #[serde(default)]
    pub items: Vec<OsdItem>,
}

/// One step of an upload exchange
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReply {
    pub state: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub new_asset: Option<Uuid>,
    #[serde(default)]
    pub new_inventory_item: Option<Uuid>,
    #[serde(default)]
    pub compiled: Option<bool>,
    #[serde(default)]
    pub errors: Vec<String>,
}
