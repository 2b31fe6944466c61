//! Item and folder fetches.

use super::rendezvous::Rendezvous;
use super::InventoryManager;
use crate::error::InventoryError;
use crate::events::InventoryEvent;
use crate::inventory::{InventoryFolder, InventoryItem, InventoryNode, SortOrder};
use crate::protocol::osd::{self, FetchDescendentsReply, FetchItemsReply, FolderFetch};
use crate::protocol::OutgoingMessage;
use crate::transport::{HttpOutcome, RequestBody, TransportPreference, TransportRoute};
use crate::types::{AgentID, FolderID, ItemID, ZERO_ID};
use std::time::Duration;
use tracing::{debug, error, warn};

const FETCH_INVENTORY: &str = "FetchInventory2";
const FETCH_LIB: &str = "FetchLib2";
const FETCH_INVENTORY_DESCENDENTS: &str = "FetchInventoryDescendents2";
const FETCH_LIB_DESCENDENTS: &str = "FetchLibDescendents2";

impl InventoryManager {
    /// Request items by id; `owner_ids[i]` owns `item_ids[i]`
    pub fn request_fetch_inventory(
        &self,
        item_ids: &[ItemID],
        owner_ids: &[AgentID],
    ) -> Result<(), InventoryError> {
        if item_ids.len() != owner_ids.len() {
            return Err(InventoryError::InvalidArgument(format!(
                "{} item ids but {} owner ids",
                item_ids.len(),
                owner_ids.len()
            )));
        }
        if item_ids.is_empty() {
            return Ok(());
        }

        let pairs: Vec<(AgentID, ItemID)> = owner_ids
            .iter()
            .copied()
            .zip(item_ids.iter().copied())
            .collect();
        let capability = if pairs[0].0 == self.agent_id() {
            FETCH_INVENTORY
        } else {
            FETCH_LIB
        };

        let route = match self.route(capability, TransportPreference::Any) {
            TransportRoute::Http(url) => {
                let body = RequestBody::Osd(osd::fetch_items_request(self.agent_id(), &pairs));
                let manager = self.clone();
                let on_result = Box::new(move |outcome: HttpOutcome| manager.on_items_fetched(outcome));
                match self.post(&url, body, on_result) {
                    Ok(()) => return Ok(()),
                    Err(e) => TransportRoute::after_http_failure(TransportPreference::Any, e.to_string()),
                }
            }
            other => other,
        };

        match route {
            TransportRoute::Unavailable(reason) => {
                warn!(reason = %reason, "Item fetch not sent");
                Ok(())
            }
            _ => self.send(OutgoingMessage::FetchInventory {
                agent_id: self.agent_id(),
                session_id: self.session_id(),
                items: pairs,
            }),
        }
    }

    /// Fetch one item and wait for it to arrive
    pub fn fetch_item(&self, item_id: ItemID, owner_id: AgentID, timeout: Duration) -> Option<InventoryItem> {
        let rendezvous = Rendezvous::new();
        let setter = rendezvous.setter();
        let _subscription = self.subscribe(move |event| {
            if let InventoryEvent::ItemReceived { item } = event {
                if item.id == item_id {
                    setter.set(item.clone());
                }
            }
        });

        if let Err(e) = self.request_fetch_inventory(&[item_id], &[owner_id]) {
            warn!(item_id = %item_id, error = %e, "Item fetch failed");
            return None;
        }
        rendezvous.wait(timeout)
    }

    pub fn request_folder_contents(
        &self,
        folder_id: FolderID,
        owner_id: AgentID,
        fetch_folders: bool,
        fetch_items: bool,
        order: SortOrder,
    ) -> Result<(), InventoryError> {
        self.request_folder_contents_with(
            folder_id,
            owner_id,
            fetch_folders,
            fetch_items,
            order,
            TransportPreference::Any,
        )
    }

    /// Request a folder listing; completion is reported by `FolderUpdated`
    pub fn request_folder_contents_with(
        &self,
        folder_id: FolderID,
        owner_id: AgentID,
        fetch_folders: bool,
        fetch_items: bool,
        order: SortOrder,
        preference: TransportPreference,
    ) -> Result<(), InventoryError> {
        let capability = if owner_id == self.agent_id() {
            FETCH_INVENTORY_DESCENDENTS
        } else {
            FETCH_LIB_DESCENDENTS
        };

        let route = match self.route(capability, preference) {
            TransportRoute::Http(url) => {
                let fetch = FolderFetch::new(folder_id, owner_id, fetch_folders, fetch_items, order);
                let body = RequestBody::Osd(osd::fetch_descendents_request(&[fetch]));
                let manager = self.clone();
                let on_result =
                    Box::new(move |outcome: HttpOutcome| manager.on_folders_fetched(&[folder_id], outcome));
                match self.post(&url, body, on_result) {
                    Ok(()) => return Ok(()),
                    Err(e) => TransportRoute::after_http_failure(preference, e.to_string()),
                }
            }
            other => other,
        };

        match route {
            TransportRoute::Unavailable(reason) => {
                warn!(folder_id = %folder_id, reason = %reason, "Folder fetch not sent");
                self.emit_all(vec![InventoryEvent::FolderUpdated {
                    folder_id,
                    success: false,
                }]);
                Ok(())
            }
            _ => self.send(OutgoingMessage::FetchInventoryDescendents {
                agent_id: self.agent_id(),
                session_id: self.session_id(),
                folder_id,
                owner_id,
                sort_order: order.bits(),
                fetch_folders,
                fetch_items,
            }),
        }
    }

    /// Fetch a folder listing and wait until every descendent has arrived
    ///
    /// Returns None on timeout or when the fetch fails.
    pub fn folder_contents(
        &self,
        folder_id: FolderID,
        owner_id: AgentID,
        fetch_folders: bool,
        fetch_items: bool,
        order: SortOrder,
        timeout: Duration,
    ) -> Option<Vec<InventoryNode>> {
        let rendezvous = Rendezvous::new();
        let setter = rendezvous.setter();
        let manager = self.clone();
        let _subscription = self.subscribe(move |event| {
            let InventoryEvent::FolderUpdated { folder_id: updated, success } = event else {
                return;
            };
            if *updated != folder_id {
                return;
            }
            if !*success {
                setter.set(false);
            } else if manager.folder_complete(&folder_id) {
                setter.set(true);
            }
        });

        if let Err(e) =
            self.request_folder_contents(folder_id, owner_id, fetch_folders, fetch_items, order)
        {
            warn!(folder_id = %folder_id, error = %e, "Folder fetch failed");
            return None;
        }

        match rendezvous.wait(timeout) {
            Some(true) => self.shared.store.get_contents(&folder_id).ok(),
            _ => None,
        }
    }

    /// Whether the store holds at least as many children as the server reported
    pub(super) fn folder_complete(&self, folder_id: &FolderID) -> bool {
        let store = self.shared.store.read();
        match (store.get_folder(folder_id), store.get_contents(folder_id)) {
            (Some(folder), Ok(contents)) => {
                usize::try_from(folder.descendent_count).unwrap_or(0) <= contents.len()
            }
            _ => false,
        }
    }

    fn on_items_fetched(&self, outcome: HttpOutcome) {
        let reply = match outcome {
            HttpOutcome::Completed(value) => osd::decode::<FetchItemsReply>(value),
            HttpOutcome::Failed(reason) => {
                warn!(reason = %reason, "Item fetch failed");
                return;
            }
            HttpOutcome::Cancelled => {
                debug!("Item fetch cancelled");
                return;
            }
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Malformed item fetch reply");
                return;
            }
        };

        let mut events = Vec::with_capacity(reply.items.len());
        {
            let mut store = self.shared.store.write();
            for osd_item in reply.items {
                let item = osd_item.into_item();
                if item.id == ZERO_ID {
                    continue;
                }
                store.add(item.clone().into());
                events.push(InventoryEvent::ItemReceived { item });
            }
        }
        self.emit_all(events);
    }

    fn on_folders_fetched(&self, requested: &[FolderID], outcome: HttpOutcome) {
        let reply = match outcome {
            HttpOutcome::Completed(value) => osd::decode::<FetchDescendentsReply>(value),
            HttpOutcome::Failed(reason) => Err(InventoryError::MalformedPayload(reason)),
            HttpOutcome::Cancelled => Err(InventoryError::MalformedPayload(
                "request cancelled".to_string(),
            )),
        };
        match reply {
            Ok(reply) => self.apply_fetched_folders(reply),
            Err(e) => {
                warn!(error = %e, "Folder fetch failed");
                self.emit_all(
                    requested
                        .iter()
                        .map(|folder_id| InventoryEvent::FolderUpdated {
                            folder_id: *folder_id,
                            success: false,
                        })
                        .collect(),
                );
            }
        }
    }

    fn apply_fetched_folders(&self, reply: FetchDescendentsReply) {
        let mut updated = Vec::with_capacity(reply.folders.len());
        {
            let mut store = self.shared.store.write();
            for contents in reply.folders {
                let folder_id = contents.folder_id;
                let owner_id = if contents.owner_id == ZERO_ID {
                    self.agent_id()
                } else {
                    contents.owner_id
                };

                if !store.contains_folder(&folder_id) {
                    let mut folder = InventoryFolder::new(folder_id);
                    folder.owner_id = owner_id;
                    store.add(folder.into());
                }
                if !store.update_folder_version(&folder_id, contents.version, contents.descendents) {
                    warn!(folder_id = %folder_id, version = contents.version, "Dropping stale folder contents");
                    updated.push(folder_id);
                    continue;
                }

                for category in contents.categories {
                    if !store.contains_folder(&category.category_id) {
                        store.add(category.into_folder(owner_id).into());
                    }
                }
                for osd_item in contents.items {
                    let item = super::ingest::repair_item(osd_item.into_item());
                    if item.id != ZERO_ID {
                        store.add(item.into());
                    }
                }
                updated.push(folder_id);
            }
        }

        let mut events: Vec<InventoryEvent> = updated
            .iter()
            .map(|folder_id| InventoryEvent::FolderUpdated {
                folder_id: *folder_id,
                success: true,
            })
            .collect();
        for bad in reply.bad_folders {
            warn!(folder_id = %bad.folder_id, error = %bad.error, "Server could not list folder");
            events.push(InventoryEvent::FolderUpdated {
                folder_id: bad.folder_id,
                success: false,
            });
        }

        for folder_id in updated {
            self.advance_searches(folder_id);
        }
        self.emit_all(events);
    }
}
