//! Core identifier types for the inventory subsystem.

use uuid::Uuid;

/// ItemID: 128-bit identity of an inventory item
pub type ItemID = Uuid;

/// FolderID: 128-bit identity of an inventory folder
pub type FolderID = Uuid;

/// AgentID: 128-bit identity of an avatar or group
pub type AgentID = Uuid;

/// LocalID: region-local handle of an in-world object
pub type LocalID = u32;

/// The all-zero sentinel meaning "none" or "root"
pub const ZERO_ID: Uuid = Uuid::nil();
