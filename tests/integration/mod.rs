//! Integration tests for the inventory store and request manager

mod push_handlers;
mod store_properties;
mod support;
mod task_inventory;
mod transport_fallback;
mod uploads;
