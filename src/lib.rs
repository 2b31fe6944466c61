//! Gridinv: Client-Side Inventory for Virtual-World Grids
//!
//! Keeps a local mirror of an agent's inventory tree consistent with the
//! server while replies arrive out of order over datagram and capability
//! transports, and offers bounded-wait request verbs on top of it.

pub mod config;
pub mod error;
pub mod events;
pub mod inventory;
pub mod logging;
pub mod protocol;
pub mod store;
pub mod sync;
pub mod task_inventory;
pub mod tooling;
pub mod transport;
pub mod types;

pub use error::{InventoryError, StorageError, TransportError};
pub use events::{EventHub, InventoryEvent, Subscription};
pub use store::InventoryStore;
pub use sync::{InventoryManager, SessionInfo, Transports};
