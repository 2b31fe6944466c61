//! Typed datagram messages exchanged with the simulator.
//!
//! Binary encoding belongs to the transport; these are the pre-decoded forms.

use crate::inventory::{
    item_crc, unix_to_datetime, AssetType, InventoryFolder, InventoryItem, InventoryType,
    Permissions, SaleType,
};
use crate::types::{AgentID, FolderID, ItemID, LocalID};
use uuid::Uuid;

/// Instant-message dialog code for an inventory offer
pub const IM_INVENTORY_OFFERED: u8 = 4;

/// Item record as carried by inventory messages
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBlock {
    pub item_id: ItemID,
    pub folder_id: FolderID,
    pub callback_id: u32,
    pub transaction_id: Uuid,
    pub creator_id: AgentID,
    pub owner_id: AgentID,
    pub group_id: AgentID,
    pub base_mask: u32,
    pub owner_mask: u32,
    pub group_mask: u32,
    pub everyone_mask: u32,
    pub next_owner_mask: u32,
    pub group_owned: bool,
    pub asset_id: Uuid,
    pub asset_type: i8,
    pub inv_type: i8,
    pub flags: u32,
    pub sale_type: u8,
    pub sale_price: i32,
    pub name: String,
    pub description: String,
    pub creation_date: i64,
    pub crc: u32,
}

impl ItemBlock {
    /// Encode an item, stamping its checksum
    pub fn from_item(item: &InventoryItem, callback_id: u32, transaction_id: Uuid) -> Self {
        let perms = &item.permissions;
        Self {
            item_id: item.id,
            folder_id: item.parent_id,
            callback_id,
            transaction_id,
            creator_id: perms.creator_id,
            owner_id: item.owner_id,
            group_id: perms.group_id,
            base_mask: perms.base_mask,
            owner_mask: perms.owner_mask,
            group_mask: perms.group_mask,
            everyone_mask: perms.everyone_mask,
            next_owner_mask: perms.next_owner_mask,
            group_owned: perms.group_owned,
            asset_id: item.asset_id,
            asset_type: item.asset_type.code(),
            inv_type: item.inventory_type.code(),
            flags: item.flags,
            sale_type: item.sale_type.code(),
            sale_price: item.sale_price,
            name: item.name.clone(),
            description: item.description.clone(),
            creation_date: item.unix_creation_date(),
            crc: item_crc(item),
        }
    }

    pub fn to_item(&self) -> InventoryItem {
        let mut item = InventoryItem::new(self.item_id);
        item.parent_id = self.folder_id;
        item.owner_id = self.owner_id;
        item.name = self.name.clone();
        item.description = self.description.clone();
        item.asset_id = self.asset_id;
        item.asset_type = AssetType::from_code(self.asset_type);
        item.inventory_type = InventoryType::from_code(self.inv_type);
        item.permissions = Permissions {
            base_mask: self.base_mask,
            owner_mask: self.owner_mask,
            group_mask: self.group_mask,
            everyone_mask: self.everyone_mask,
            next_owner_mask: self.next_owner_mask,
            creator_id: self.creator_id,
            owner_id: self.owner_id,
            last_owner_id: self.owner_id,
            group_id: self.group_id,
            group_owned: self.group_owned,
        };
        item.sale_type = SaleType::from_code(self.sale_type);
        item.sale_price = self.sale_price;
        item.flags = self.flags;
        item.creation_date = unix_to_datetime(self.creation_date);
        item
    }
}

/// Folder record as carried by inventory messages
#[derive(Debug, Clone, PartialEq)]
pub struct FolderBlock {
    pub folder_id: FolderID,
    pub parent_id: FolderID,
    pub preferred_type: i8,
    pub name: String,
}

impl FolderBlock {
    pub fn to_folder(&self, owner_id: AgentID) -> InventoryFolder {
        let mut folder = InventoryFolder::new(self.folder_id);
        folder.parent_id = self.parent_id;
        folder.preferred_type = AssetType::from_code(self.preferred_type);
        folder.name = self.name.clone();
        folder.owner_id = owner_id;
        folder
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveItemBlock {
    pub item_id: ItemID,
    pub folder_id: FolderID,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyItemBlock {
    pub callback_id: u32,
    pub old_agent_id: AgentID,
    pub old_item_id: ItemID,
    pub new_folder_id: FolderID,
    pub new_name: String,
}

/// Where a de-rezzed object goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeRezDestination {
    AgentInventorySave = 0,
    AgentInventoryCopy = 1,
    TaskInventory = 2,
    Attachment = 3,
    AgentInventoryTake = 4,
    ForceToGodInventory = 5,
    TrashFolder = 6,
    AttachmentToInventory = 7,
    AttachmentExists = 8,
    ReturnToOwner = 9,
    ReturnToLastOwner = 10,
}

/// Placement parameters for rezzing an item in-world
#[derive(Debug, Clone, PartialEq)]
pub struct RezData {
    pub from_task_id: Uuid,
    pub bypass_raycast: bool,
    pub ray_start: [f32; 3],
    pub ray_end: [f32; 3],
    pub ray_target_id: Uuid,
    pub ray_end_is_intersection: bool,
    pub rez_selected: bool,
    pub remove_item: bool,
    pub item_flags: u32,
    pub group_mask: u32,
    pub everyone_mask: u32,
    pub next_owner_mask: u32,
}

/// Messages the client sends
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    FetchInventoryDescendents {
        agent_id: AgentID,
        session_id: Uuid,
        folder_id: FolderID,
        owner_id: AgentID,
        sort_order: u32,
        fetch_folders: bool,
        fetch_items: bool,
    },
    FetchInventory {
        agent_id: AgentID,
        session_id: Uuid,
        /// (owner, item) pairs
        items: Vec<(AgentID, ItemID)>,
    },
    MoveInventoryFolder {
        agent_id: AgentID,
        session_id: Uuid,
        stamp: bool,
        /// (folder, new parent) pairs
        folders: Vec<(FolderID, FolderID)>,
    },
    MoveInventoryItem {
        agent_id: AgentID,
        session_id: Uuid,
        stamp: bool,
        items: Vec<MoveItemBlock>,
    },
    UpdateInventoryFolder {
        agent_id: AgentID,
        session_id: Uuid,
        folders: Vec<FolderBlock>,
    },
    CopyInventoryItem {
        agent_id: AgentID,
        session_id: Uuid,
        items: Vec<CopyItemBlock>,
    },
    CopyInventoryFromNotecard {
        agent_id: AgentID,
        session_id: Uuid,
        notecard_item_id: ItemID,
        object_id: Uuid,
        item_id: ItemID,
        folder_id: FolderID,
    },
    RemoveInventoryObjects {
        agent_id: AgentID,
        session_id: Uuid,
        folder_ids: Vec<FolderID>,
        item_ids: Vec<ItemID>,
    },
    PurgeInventoryDescendents {
        agent_id: AgentID,
        session_id: Uuid,
        folder_id: FolderID,
    },
    CreateInventoryFolder {
        agent_id: AgentID,
        session_id: Uuid,
        folder: FolderBlock,
    },
    CreateInventoryItem {
        agent_id: AgentID,
        session_id: Uuid,
        callback_id: u32,
        folder_id: FolderID,
        transaction_id: Uuid,
        next_owner_mask: u32,
        asset_type: i8,
        inv_type: i8,
        wearable_type: u8,
        name: String,
        description: String,
    },
    UpdateInventoryItem {
        agent_id: AgentID,
        session_id: Uuid,
        transaction_id: Uuid,
        items: Vec<ItemBlock>,
    },
    RezObject {
        agent_id: AgentID,
        session_id: Uuid,
        group_id: AgentID,
        rez: RezData,
        item: ItemBlock,
    },
    DeRezObject {
        agent_id: AgentID,
        session_id: Uuid,
        group_id: AgentID,
        destination: u8,
        destination_id: FolderID,
        transaction_id: Uuid,
        local_ids: Vec<LocalID>,
    },
    RezScript {
        agent_id: AgentID,
        session_id: Uuid,
        group_id: AgentID,
        enabled: bool,
        object_local_id: LocalID,
        item: ItemBlock,
    },
    UpdateTaskInventory {
        agent_id: AgentID,
        session_id: Uuid,
        object_local_id: LocalID,
        item: ItemBlock,
    },
    RemoveTaskInventory {
        agent_id: AgentID,
        session_id: Uuid,
        object_local_id: LocalID,
        item_id: ItemID,
    },
    RequestTaskInventory {
        agent_id: AgentID,
        session_id: Uuid,
        object_local_id: LocalID,
    },
    MoveTaskInventory {
        agent_id: AgentID,
        session_id: Uuid,
        folder_id: FolderID,
        object_local_id: LocalID,
        item_id: ItemID,
    },
    GetScriptRunning {
        object_id: Uuid,
        item_id: ItemID,
    },
    SetScriptRunning {
        agent_id: AgentID,
        session_id: Uuid,
        object_id: Uuid,
        item_id: ItemID,
        running: bool,
    },
    ImprovedInstantMessage {
        agent_id: AgentID,
        session_id: Uuid,
        to_agent_id: AgentID,
        id: Uuid,
        dialog: u8,
        from_agent_name: String,
        message: String,
        binary_bucket: Vec<u8>,
        timestamp: u32,
    },
}

impl OutgoingMessage {
    /// Message name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            OutgoingMessage::FetchInventoryDescendents { .. } => "FetchInventoryDescendents",
            OutgoingMessage::FetchInventory { .. } => "FetchInventory",
            OutgoingMessage::MoveInventoryFolder { .. } => "MoveInventoryFolder",
            OutgoingMessage::MoveInventoryItem { .. } => "MoveInventoryItem",
            OutgoingMessage::UpdateInventoryFolder { .. } => "UpdateInventoryFolder",
            OutgoingMessage::CopyInventoryItem { .. } => "CopyInventoryItem",
            OutgoingMessage::CopyInventoryFromNotecard { .. } => "CopyInventoryFromNotecard",
            OutgoingMessage::RemoveInventoryObjects { .. } => "RemoveInventoryObjects",
            OutgoingMessage::PurgeInventoryDescendents { .. } => "PurgeInventoryDescendents",
            OutgoingMessage::CreateInventoryFolder { .. } => "CreateInventoryFolder",
            OutgoingMessage::CreateInventoryItem { .. } => "CreateInventoryItem",
            OutgoingMessage::UpdateInventoryItem { .. } => "UpdateInventoryItem",
            OutgoingMessage::RezObject { .. } => "RezObject",
            OutgoingMessage::DeRezObject { .. } => "DeRezObject",
            OutgoingMessage::RezScript { .. } => "RezScript",
            OutgoingMessage::UpdateTaskInventory { .. } => "UpdateTaskInventory",
            OutgoingMessage::RemoveTaskInventory { .. } => "RemoveTaskInventory",
            OutgoingMessage::RequestTaskInventory { .. } => "RequestTaskInventory",
            OutgoingMessage::MoveTaskInventory { .. } => "MoveTaskInventory",
            OutgoingMessage::GetScriptRunning { .. } => "GetScriptRunning",
            OutgoingMessage::SetScriptRunning { .. } => "SetScriptRunning",
            OutgoingMessage::ImprovedInstantMessage { .. } => "ImprovedInstantMessage",
        }
    }
}

/// Messages pushed by the server
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    InventoryDescendents {
        agent_id: AgentID,
        folder_id: FolderID,
        owner_id: AgentID,
        version: i32,
        descendents: i32,
        folders: Vec<FolderBlock>,
        items: Vec<ItemBlock>,
    },
    UpdateCreateInventoryItem {
        sim_approved: bool,
        transaction_id: Uuid,
        items: Vec<ItemBlock>,
    },
    BulkUpdateInventory {
        transaction_id: Uuid,
        folders: Vec<FolderBlock>,
        items: Vec<ItemBlock>,
    },
    MoveInventoryItem {
        stamp: bool,
        items: Vec<MoveItemBlock>,
    },
    FetchInventoryReply {
        agent_id: AgentID,
        items: Vec<ItemBlock>,
    },
    ReplyTaskInventory {
        task_id: Uuid,
        serial: i16,
        filename: String,
    },
    ScriptRunningReply {
        object_id: Uuid,
        item_id: ItemID,
        running: bool,
        mono: bool,
    },
    SaveAssetIntoInventory {
        item_id: ItemID,
        new_asset_id: Uuid,
    },
    RemoveInventoryObjects {
        folder_ids: Vec<FolderID>,
        item_ids: Vec<ItemID>,
    },
}
