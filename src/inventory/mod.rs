//! Inventory Data Model
//!
//! Folders and items mirrored from the server, their classifications and the
//! checksum used to detect stale client copies.

pub mod crc;
pub mod kinds;
pub mod node;

pub use crc::{item_crc, uuid_crc};
pub use kinds::{AssetType, InventoryType, SaleType, SortOrder, WearableType};
pub use node::{unix_to_datetime, InventoryFolder, InventoryItem, InventoryNode, Permissions};
