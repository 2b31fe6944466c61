//! Inventory node types: folders, items and their permissions.

use super::kinds::{AssetType, InventoryType, SaleType};
use crate::types::{AgentID, FolderID, ItemID, ZERO_ID};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission masks and identities attached to an item
///
/// The masks are independent; no relationship between them is enforced
/// client side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub base_mask: u32,
    pub owner_mask: u32,
    pub group_mask: u32,
    pub everyone_mask: u32,
    pub next_owner_mask: u32,
    pub creator_id: AgentID,
    pub owner_id: AgentID,
    pub last_owner_id: AgentID,
    pub group_id: AgentID,
    pub group_owned: bool,
}

impl Permissions {
    pub const PERM_TRANSFER: u32 = 1 << 13;
    pub const PERM_MODIFY: u32 = 1 << 14;
    pub const PERM_COPY: u32 = 1 << 15;

    /// Whether the current owner may copy the item
    pub fn owner_can_copy(&self) -> bool {
        self.owner_mask & Self::PERM_COPY != 0
    }
}

/// Inventory folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryFolder {
    pub id: FolderID,
    /// Declared parent; may name a folder the store has not seen yet
    pub parent_id: FolderID,
    pub owner_id: AgentID,
    pub name: String,
    /// Server version of the folder's contents
    pub version: i32,
    /// Server-reported number of descendents, folders and items combined
    pub descendent_count: i32,
    pub preferred_type: AssetType,
    /// True until a descendents reply for this folder has been applied
    pub needs_update: bool,
    /// Ids of linked children, folders and items; rebuilt on restore
    #[serde(skip)]
    pub children: Vec<Uuid>,
}

impl InventoryFolder {
    pub fn new(id: FolderID) -> Self {
        Self {
            id,
            parent_id: ZERO_ID,
            owner_id: ZERO_ID,
            name: String::new(),
            version: 0,
            descendent_count: 0,
            preferred_type: AssetType::Unknown,
            needs_update: true,
            children: Vec::new(),
        }
    }

    /// The synthetic all-zero root every top-level folder hangs from
    pub fn root() -> Self {
        let mut root = Self::new(ZERO_ID);
        root.needs_update = false;
        root
    }
}

/// Inventory item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemID,
    pub parent_id: FolderID,
    pub owner_id: AgentID,
    pub name: String,
    pub description: String,
    pub asset_id: Uuid,
    pub asset_type: AssetType,
    pub inventory_type: InventoryType,
    pub permissions: Permissions,
    pub sale_type: SaleType,
    pub sale_price: i32,
    pub flags: u32,
    pub creation_date: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(id: ItemID) -> Self {
        Self {
            id,
            parent_id: ZERO_ID,
            owner_id: ZERO_ID,
            name: String::new(),
            description: String::new(),
            asset_id: ZERO_ID,
            asset_type: AssetType::Unknown,
            inventory_type: InventoryType::Unknown,
            permissions: Permissions::default(),
            sale_type: SaleType::Not,
            sale_price: 0,
            flags: 0,
            creation_date: unix_to_datetime(0),
        }
    }

    /// Creation time in whole seconds since the Unix epoch
    pub fn unix_creation_date(&self) -> i64 {
        self.creation_date.timestamp()
    }
}

/// Convert Unix seconds into a UTC timestamp, clamping out-of-range values to the epoch
pub fn unix_to_datetime(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Either kind of inventory node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InventoryNode {
    Folder(InventoryFolder),
    Item(InventoryItem),
}

impl InventoryNode {
    pub fn id(&self) -> Uuid {
        match self {
            InventoryNode::Folder(f) => f.id,
            InventoryNode::Item(i) => i.id,
        }
    }

    pub fn parent_id(&self) -> Uuid {
        match self {
            InventoryNode::Folder(f) => f.parent_id,
            InventoryNode::Item(i) => i.parent_id,
        }
    }

    pub fn set_parent_id(&mut self, parent_id: Uuid) {
        match self {
            InventoryNode::Folder(f) => f.parent_id = parent_id,
            InventoryNode::Item(i) => i.parent_id = parent_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InventoryNode::Folder(f) => &f.name,
            InventoryNode::Item(i) => &i.name,
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            InventoryNode::Folder(f) => f.name = name,
            InventoryNode::Item(i) => i.name = name,
        }
    }

    pub fn owner_id(&self) -> Uuid {
        match self {
            InventoryNode::Folder(f) => f.owner_id,
            InventoryNode::Item(i) => i.owner_id,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, InventoryNode::Folder(_))
    }

    pub fn as_folder(&self) -> Option<&InventoryFolder> {
        match self {
            InventoryNode::Folder(f) => Some(f),
            InventoryNode::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&InventoryItem> {
        match self {
            InventoryNode::Item(i) => Some(i),
            InventoryNode::Folder(_) => None,
        }
    }
}

impl From<InventoryFolder> for InventoryNode {
    fn from(folder: InventoryFolder) -> Self {
        InventoryNode::Folder(folder)
    }
}

impl From<InventoryItem> for InventoryNode {
    fn from(item: InventoryItem) -> Self {
        InventoryNode::Item(item)
    }
}
