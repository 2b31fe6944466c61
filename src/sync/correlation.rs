//! Correlation-id tables for item creation and copy replies.
//!
//! Ids come from a `u32` counter shared by both tables. The counter wraps,
//! skipping zero (the id the server echoes for unsolicited updates), so an id
//! still pending after 2^32 - 1 further registrations is overwritten. That
//! collision is logged rather than prevented.

use crate::inventory::{InventoryItem, InventoryType};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::warn;

/// Id the server echoes for notecard copies and unsolicited updates
pub const NOTECARD_COPY_ID: u32 = 0;

/// Called once with the server's confirmation of a created item
pub type ItemCreatedCallback = Box<dyn FnOnce(bool, Option<InventoryItem>) + Send + 'static>;

/// Called once with the first copied item echoed back
pub type ItemCopiedCallback = Box<dyn FnOnce(InventoryItem) + Send + 'static>;

struct Tables {
    next_id: u32,
    created: HashMap<u32, ItemCreatedCallback>,
    copied: HashMap<u32, ItemCopiedCallback>,
    type_overrides: HashMap<u32, InventoryType>,
}

impl Tables {
    fn mint(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1;
        }
        id
    }
}

pub struct CorrelationTable {
    tables: Mutex<Tables>,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Table whose first minted id is `first`
    pub fn starting_at(first: u32) -> Self {
        Self {
            tables: Mutex::new(Tables {
                next_id: first.max(1),
                created: HashMap::new(),
                copied: HashMap::new(),
                type_overrides: HashMap::new(),
            }),
        }
    }

    /// Register a creation handler and the inventory type the item must carry
    pub fn register_created(
        &self,
        callback: ItemCreatedCallback,
        inventory_type: Option<InventoryType>,
    ) -> u32 {
        let mut tables = self.tables.lock();
        let id = tables.mint();
        if tables.created.insert(id, callback).is_some() {
            warn!(callback_id = id, "Overwrote a pending item-created callback");
        }
        match inventory_type {
            Some(inventory_type) => {
                tables.type_overrides.insert(id, inventory_type);
            }
            None => {
                tables.type_overrides.remove(&id);
            }
        }
        id
    }

    pub fn register_copied(&self, callback: ItemCopiedCallback) -> u32 {
        let mut tables = self.tables.lock();
        let id = tables.mint();
        if tables.copied.insert(id, callback).is_some() {
            warn!(callback_id = id, "Overwrote a pending item-copied callback");
        }
        id
    }

    /// Register the handler for a copy out of a notecard
    ///
    /// The server answers these with callback id 0, so only the most recent
    /// notecard copy can be awaited at a time.
    pub fn register_notecard_copy(&self, callback: ItemCopiedCallback) -> u32 {
        let mut tables = self.tables.lock();
        if tables.copied.insert(NOTECARD_COPY_ID, callback).is_some() {
            warn!("Replaced a pending notecard copy callback");
        }
        NOTECARD_COPY_ID
    }

    pub fn take_created(&self, id: u32) -> Option<ItemCreatedCallback> {
        self.tables.lock().created.remove(&id)
    }

    pub fn take_copied(&self, id: u32) -> Option<ItemCopiedCallback> {
        self.tables.lock().copied.remove(&id)
    }

    pub fn take_type_override(&self, id: u32) -> Option<InventoryType> {
        self.tables.lock().type_overrides.remove(&id)
    }

    pub fn pending(&self) -> usize {
        let tables = self.tables.lock();
        tables.created.len() + tables.copied.len()
    }
}
