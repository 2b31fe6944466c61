//! Inventory notifications.
//!
//! Listeners are registered on an [`EventHub`] and removed when the returned
//! [`Subscription`] is dropped. Events are emitted after the store lock has
//! been released, so listeners may read the store.

use crate::inventory::{InventoryItem, InventoryType};
use crate::types::{AgentID, FolderID, ItemID};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum InventoryEvent {
    /// An item was fetched or pushed into the store
    ItemReceived { item: InventoryItem },
    /// A folder listing finished; `success` is false when the fetch failed
    FolderUpdated { folder_id: FolderID, success: bool },
    /// A path search resolved
    FindObjectByPathReply { path: String, object_id: Uuid },
    /// An item was created in agent inventory, typically by an object
    TaskItemReceived {
        item_id: ItemID,
        folder_id: FolderID,
        creator_id: AgentID,
        asset_id: Uuid,
        inventory_type: InventoryType,
    },
    /// The simulator named the file holding an object's inventory listing
    TaskInventoryReply {
        item_id: Uuid,
        serial: i16,
        asset_filename: String,
    },
    SaveAssetToInventory { item_id: ItemID, new_asset_id: Uuid },
    ScriptRunningReply {
        object_id: Uuid,
        script_id: ItemID,
        is_running: bool,
        is_mono: bool,
    },
}

impl InventoryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InventoryEvent::ItemReceived { .. } => "ItemReceived",
            InventoryEvent::FolderUpdated { .. } => "FolderUpdated",
            InventoryEvent::FindObjectByPathReply { .. } => "FindObjectByPathReply",
            InventoryEvent::TaskItemReceived { .. } => "TaskItemReceived",
            InventoryEvent::TaskInventoryReply { .. } => "TaskInventoryReply",
            InventoryEvent::SaveAssetToInventory { .. } => "SaveAssetToInventory",
            InventoryEvent::ScriptRunningReply { .. } => "ScriptRunningReply",
        }
    }
}

type Listener = Arc<dyn Fn(&InventoryEvent) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Fan-out of inventory events to registered listeners
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener until the returned subscription is dropped
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&InventoryEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push((id, Arc::new(listener)));
        Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver an event to every listener registered at the time of the call
    pub fn emit(&self, event: &InventoryEvent) {
        let listeners: Vec<Listener> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!(event = event.kind(), listeners = listeners.len(), "Emitting inventory event");
        for listener in listeners {
            listener(event);
        }
    }

    pub fn emit_all(&self, events: Vec<InventoryEvent>) {
        for event in &events {
            self.emit(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

/// Registration handle; unregisters its listener on drop
pub struct Subscription {
    hub: Weak<Mutex<HubInner>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.lock().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
