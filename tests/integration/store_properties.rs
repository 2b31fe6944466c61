use crate::integration::support::{folder_block, harness, item_block};
use gridinv::inventory::{item_crc, AssetType, InventoryFolder, InventoryItem, InventoryType};
use gridinv::protocol::{IncomingMessage, ItemBlock, OutgoingMessage};
use gridinv::store::StoreInner;
use gridinv::types::ZERO_ID;
use proptest::prelude::*;
use uuid::Uuid;

fn folder_id(level: usize) -> Uuid {
    Uuid::from_u128(0x1000 + level as u128)
}

fn item_id(level: usize) -> Uuid {
    Uuid::from_u128(0x2000 + level as u128)
}

/// A chain of folders, each holding one item; index i < depth is a folder
fn chain_node(index: usize, depth: usize) -> gridinv::inventory::InventoryNode {
    if index < depth {
        let mut folder = InventoryFolder::new(folder_id(index));
        folder.parent_id = if index == 0 { ZERO_ID } else { folder_id(index - 1) };
        folder.name = format!("level {}", index);
        folder.into()
    } else {
        let level = index - depth;
        let mut item = InventoryItem::new(item_id(level));
        item.parent_id = folder_id(level);
        item.name = format!("item {}", level);
        item.into()
    }
}

proptest! {
    #[test]
    fn any_insertion_order_yields_the_same_tree(
        order in (1usize..6).prop_flat_map(|depth| Just((0..depth * 2).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let depth = order.len() / 2;
        let mut store = StoreInner::new();
        for index in &order {
            store.add(chain_node(*index, depth));
        }

        prop_assert_eq!(store.unresolved_len(), 0);
        prop_assert_eq!(store.len(), depth * 2);
        for level in 0..depth {
            let contents = store.get_contents(&folder_id(level)).unwrap();
            let ids: Vec<Uuid> = contents.iter().map(|n| n.id()).collect();
            prop_assert!(ids.contains(&item_id(level)));
            if level + 1 < depth {
                prop_assert!(ids.contains(&folder_id(level + 1)));
            }
            prop_assert_eq!(store.get_item(&item_id(level)).unwrap().parent_id, folder_id(level));
        }
        prop_assert_eq!(
            &store.get_folder(&ZERO_ID).unwrap().children,
            &vec![folder_id(0)]
        );
    }
}

#[test]
fn repeated_item_push_keeps_one_entry_with_latest_values() {
    let h = harness();
    let id = Uuid::new_v4();
    let first = item_block(id, h.root, "Old name", AssetType::Notecard, 7);
    let mut second = first.clone();
    second.name = "New name".to_string();
    second.sale_price = 25;

    for block in [first, second] {
        h.manager.handle_message(IncomingMessage::FetchInventoryReply {
            agent_id: h.agent_id,
            items: vec![block],
        });
    }

    let item = h.manager.store().get_item(&id).unwrap();
    assert_eq!(item.name, "New name");
    assert_eq!(item.sale_price, 25);
    let root_children = h.manager.store().get_folder(&h.root).unwrap().children;
    assert_eq!(root_children.iter().filter(|c| **c == id).count(), 1);
    assert_eq!(h.manager.store().items().len(), 1);
}

#[test]
fn older_descendents_packet_leaves_folder_untouched() {
    let h = harness();
    let folder = Uuid::new_v4();
    let mut f = InventoryFolder::new(folder);
    f.parent_id = h.root;
    f.name = "Notes".to_string();
    h.manager.store().add(f);

    let a = item_block(Uuid::new_v4(), folder, "a", AssetType::Notecard, 7);
    let b = item_block(Uuid::new_v4(), folder, "b", AssetType::Notecard, 7);
    let c = item_block(Uuid::new_v4(), folder, "c", AssetType::Notecard, 7);

    let packet = |version: i32, items: Vec<ItemBlock>| IncomingMessage::InventoryDescendents {
        agent_id: h.agent_id,
        folder_id: folder,
        owner_id: h.agent_id,
        version,
        descendents: items.len() as i32,
        folders: Vec::new(),
        items,
    };

    h.manager.handle_message(packet(5, vec![a.clone(), b.clone()]));
    h.manager.handle_message(packet(4, vec![a.clone(), b.clone(), c.clone()]));

    let stale = h.manager.store().get_folder(&folder).unwrap();
    assert_eq!(stale.version, 5);
    assert_eq!(stale.descendent_count, 2);
    assert_eq!(stale.children.len(), 2);
    assert!(!h.manager.store().contains_item(&c.item_id));

    h.manager.handle_message(packet(6, vec![a, b, c.clone()]));
    let fresh = h.manager.store().get_folder(&folder).unwrap();
    assert_eq!(fresh.version, 6);
    assert_eq!(fresh.descendent_count, 3);
    assert_eq!(fresh.children.len(), 3);
    assert!(h.manager.store().contains_item(&c.item_id));
}

#[test]
fn descendents_for_uncached_folder_are_dropped() {
    let h = harness();
    let unknown = Uuid::new_v4();
    h.manager.handle_message(IncomingMessage::InventoryDescendents {
        agent_id: h.agent_id,
        folder_id: unknown,
        owner_id: h.agent_id,
        version: 1,
        descendents: 1,
        folders: vec![folder_block(Uuid::new_v4(), unknown, "Sub", AssetType::Unknown)],
        items: Vec::new(),
    });
    assert!(!h.manager.store().contains_folder(&unknown));
    assert_eq!(h.manager.store().len(), 1);
}

#[test]
fn removing_a_folder_removes_every_descendant() {
    let h = harness();
    let top = Uuid::new_v4();
    let sub = Uuid::new_v4();
    let sibling = Uuid::new_v4();
    let store = h.manager.store();

    for (id, parent, name) in [(top, h.root, "Top"), (sibling, h.root, "Sibling"), (sub, top, "Sub")] {
        let mut f = InventoryFolder::new(id);
        f.parent_id = parent;
        f.name = name.to_string();
        store.add(f);
    }
    let items: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    for (i, id) in items.iter().enumerate() {
        let mut item = InventoryItem::new(*id);
        item.parent_id = if i % 2 == 0 { top } else { sub };
        store.add(item);
    }
    let before = store.len();

    h.manager.remove_folder(top).unwrap();

    assert_eq!(store.len(), before - 6);
    assert!(!store.contains(&top));
    assert!(!store.contains(&sub));
    assert!(items.iter().all(|id| !store.contains(id)));
    assert_eq!(store.get_folder(&h.root).unwrap().children, vec![sibling]);

    let sent = h.datagram.sent_named("RemoveInventoryObjects");
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        OutgoingMessage::RemoveInventoryObjects {
            folder_ids,
            item_ids,
            ..
        } => {
            assert_eq!(folder_ids, &vec![top]);
            assert!(item_ids.is_empty());
        }
        other => panic!("unexpected message {:?}", other),
    }
}

#[test]
fn checksum_depends_only_on_item_state() {
    let mut item = InventoryItem::new(Uuid::from_u128(0xfeed));
    item.parent_id = Uuid::from_u128(0xbeef);
    item.asset_type = AssetType::Object;
    item.inventory_type = InventoryType::Object;
    item.sale_price = 10;

    let copy = item.clone();
    assert_eq!(item_crc(&item), item_crc(&copy));

    item.name = "renamed".to_string();
    assert_eq!(item_crc(&item), item_crc(&copy));

    item.sale_price = 11;
    assert_ne!(item_crc(&item), item_crc(&copy));
}
