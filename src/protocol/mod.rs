//! Protocol
//!
//! Typed datagram messages and capability payload mapping.

pub mod messages;
pub mod osd;

pub use messages::{
    CopyItemBlock, DeRezDestination, FolderBlock, IncomingMessage, ItemBlock, MoveItemBlock, OutgoingMessage,
    RezData, IM_INVENTORY_OFFERED,
};
