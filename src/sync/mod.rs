//! Synchronization / Request Manager
//!
//! One [`InventoryManager`] per session. Verbs pick a transport, mutate the
//! store optimistically where the server is expected to agree, and send the
//! request. Replies come back through [`InventoryManager::handle_message`]
//! (datagrams) or capability callbacks, on whatever thread delivers them.
//!
//! Store mutations happen under the store's write guard. Events, correlation
//! callbacks and follow-up requests are collected while the guard is held and
//! dispatched after it is released.

mod correlation;
mod fetch;
mod give;
mod ingest;
mod mutate;
mod rendezvous;
mod search;
mod task;
mod upload;

pub use correlation::{CorrelationTable, ItemCopiedCallback, ItemCreatedCallback};
pub use rendezvous::{Rendezvous, RendezvousSetter};
pub use upload::{UploadCallback, UploadResult};

use crate::config::InventoryConfig;
use crate::error::{InventoryError, TransportError};
use crate::events::{EventHub, InventoryEvent, Subscription};
use crate::protocol::OutgoingMessage;
use crate::store::InventoryStore;
use crate::transport::{
    CapabilityTransport, DatagramTransport, HttpCallback, RequestBody, TaskFileSource,
    TransportPreference, TransportRoute,
};
use crate::types::{AgentID, FolderID, ZERO_ID};
use parking_lot::Mutex;
use search::InventorySearch;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of the logged-in agent and the roots of its two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub agent_id: AgentID,
    pub session_id: Uuid,
    pub agent_name: String,
    /// Root of the agent's own inventory
    pub inventory_root: FolderID,
    /// Root of the shared library
    pub library_root: FolderID,
    pub library_owner: AgentID,
}

impl SessionInfo {
    pub fn new(agent_id: AgentID, session_id: Uuid, inventory_root: FolderID) -> Self {
        Self {
            agent_id,
            session_id,
            agent_name: String::new(),
            inventory_root,
            library_root: ZERO_ID,
            library_owner: ZERO_ID,
        }
    }
}

/// Collaborators the manager talks through
#[derive(Clone)]
pub struct Transports {
    pub datagram: Arc<dyn DatagramTransport>,
    pub capabilities: Arc<dyn CapabilityTransport>,
    pub task_files: Arc<dyn TaskFileSource>,
}

struct Shared {
    session: SessionInfo,
    config: InventoryConfig,
    store: InventoryStore,
    transports: Transports,
    events: EventHub,
    callbacks: CorrelationTable,
    searches: Mutex<Vec<InventorySearch>>,
}

/// Inventory request manager; cheap to clone, all clones share state
#[derive(Clone)]
pub struct InventoryManager {
    shared: Arc<Shared>,
}

impl InventoryManager {
    pub fn new(session: SessionInfo, config: InventoryConfig, transports: Transports) -> Self {
        info!(
            agent_id = %session.agent_id,
            http_inventory = config.http_inventory,
            "Creating inventory manager"
        );
        let store = InventoryStore::new(session.agent_id);
        Self {
            shared: Arc::new(Shared {
                session,
                config,
                store,
                transports,
                events: EventHub::new(),
                callbacks: CorrelationTable::new(),
                searches: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn session(&self) -> &SessionInfo {
        &self.shared.session
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &InventoryStore {
        &self.shared.store
    }

    pub fn events(&self) -> &EventHub {
        &self.shared.events
    }

    /// Register an event listener; see [`EventHub::subscribe`]
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&InventoryEvent) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(listener)
    }

    /// Correlation callbacks still waiting for a reply
    pub fn pending_callbacks(&self) -> usize {
        self.shared.callbacks.pending()
    }

    /// Write the store to the configured cache file
    pub fn save_cache(&self) -> Result<usize, InventoryError> {
        let path = self.cache_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::error::StorageError::from)?;
        }
        Ok(self.shared.store.save_to_disk(&path)?)
    }

    /// Reload the store from the configured cache file
    ///
    /// On failure the store is left empty and the session continues.
    pub fn restore_cache(&self) -> Result<usize, InventoryError> {
        let path = self.cache_path()?;
        Ok(self.shared.store.restore_from_disk(&path)?)
    }

    fn cache_path(&self) -> Result<PathBuf, InventoryError> {
        self.shared.config.cache_path(self.shared.session.agent_id)
    }

    fn agent_id(&self) -> AgentID {
        self.shared.session.agent_id
    }

    fn session_id(&self) -> Uuid {
        self.shared.session.session_id
    }

    fn send(&self, message: OutgoingMessage) -> Result<(), InventoryError> {
        let name = message.name();
        debug!(message = name, "Sending inventory message");
        self.shared.transports.datagram.send(message).map_err(|e| {
            warn!(message = name, error = %e, "Datagram send failed");
            InventoryError::from(e)
        })
    }

    /// Send a batch of follow-up messages produced by a handler
    fn send_all(&self, messages: Vec<OutgoingMessage>) {
        for message in messages {
            // Failures are already logged by send
            let _ = self.send(message);
        }
    }

    fn route(&self, capability: &str, preference: TransportPreference) -> TransportRoute {
        TransportRoute::select(
            capability,
            self.shared.config.http_inventory,
            self.shared.transports.capabilities.capability_uri(capability),
            preference,
        )
    }

    fn post(&self, url: &str, body: RequestBody, on_result: HttpCallback) -> Result<(), TransportError> {
        debug!(url = %url, "Posting capability request");
        self.shared.transports.capabilities.post(
            url,
            body,
            self.shared.config.request_timeout(),
            on_result,
        )
    }

    fn emit_all(&self, events: Vec<InventoryEvent>) {
        self.shared.events.emit_all(events);
    }
}
