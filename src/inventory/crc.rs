//! Item checksum sent with update and rez requests.
//!
//! The server compares this value with its own copy to detect a stale client
//! item. All additions wrap at 32 bits.

use super::node::InventoryItem;
use uuid::Uuid;

/// Sum of the four little-endian 32-bit words of an id
pub fn uuid_crc(id: &Uuid) -> u32 {
    id.as_bytes()
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .fold(0u32, u32::wrapping_add)
}

/// Compute the checksum of an item's server-visible state
pub fn item_crc(item: &InventoryItem) -> u32 {
    let perms = &item.permissions;
    let mut crc: u32 = 0;

    crc = crc.wrapping_add(uuid_crc(&item.asset_id));
    crc = crc.wrapping_add(uuid_crc(&item.parent_id));
    crc = crc.wrapping_add(uuid_crc(&item.id));

    crc = crc.wrapping_add(perms.owner_mask);
    crc = crc.wrapping_add(perms.next_owner_mask);
    crc = crc.wrapping_add(perms.everyone_mask);
    crc = crc.wrapping_add(perms.group_mask);

    crc = crc.wrapping_add(uuid_crc(&perms.creator_id));
    crc = crc.wrapping_add(uuid_crc(&perms.owner_id));
    crc = crc.wrapping_add(uuid_crc(&perms.group_id));

    crc = crc.wrapping_add(item.flags);
    crc = crc.wrapping_add(item.inventory_type.code() as u32);
    crc = crc.wrapping_add(item.asset_type.code() as u32);
    crc = crc.wrapping_add(item.unix_creation_date() as u32);
    crc = crc.wrapping_add(item.sale_price as u32);
    crc = crc.wrapping_add((item.sale_type.code() as u32).wrapping_mul(0x0707_3096));

    crc
}
