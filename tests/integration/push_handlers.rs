use crate::integration::support::{harness, item_block, record_events, Harness};
use gridinv::inventory::{item_crc, AssetType, InventoryFolder, InventoryItem, InventoryType, WearableType};
use gridinv::protocol::{IncomingMessage, MoveItemBlock, OutgoingMessage};
use gridinv::{InventoryError, InventoryEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

fn cached_folder(h: &Harness, parent: Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let mut f = InventoryFolder::new(id);
    f.parent_id = parent;
    f.name = name.to_string();
    h.manager.store().add(f);
    id
}

fn cached_item(h: &Harness, parent: Uuid, name: &str) -> InventoryItem {
    let mut item = InventoryItem::new(Uuid::new_v4());
    item.parent_id = parent;
    item.name = name.to_string();
    item.asset_type = AssetType::Notecard;
    item.inventory_type = InventoryType::Notecard;
    h.manager.store().add(item.clone());
    item
}

#[test]
fn server_move_relinks_and_renames_item() {
    let h = harness();
    let from = cached_folder(&h, h.root, "Inbox");
    let to = cached_folder(&h, h.root, "Archive");
    let item = cached_item(&h, from, "Note");
    let (_subscription, events) = record_events(&h.manager);

    h.manager.handle_message(IncomingMessage::MoveInventoryItem {
        stamp: false,
        items: vec![
            MoveItemBlock {
                item_id: item.id,
                folder_id: to,
                new_name: "Old note".to_string(),
            },
            MoveItemBlock {
                item_id: Uuid::new_v4(),
                folder_id: to,
                new_name: String::new(),
            },
        ],
    });

    let store = h.manager.store();
    let moved = store.get_item(&item.id).unwrap();
    assert_eq!(moved.parent_id, to);
    assert_eq!(moved.name, "Old note");
    assert!(store.get_contents(&from).unwrap().is_empty());
    assert_eq!(store.get_folder(&to).unwrap().children, vec![item.id]);
    assert_eq!(*events.lock(), vec![InventoryEvent::ItemReceived { item: moved }]);
}

#[test]
fn server_removal_drops_folders_recursively_and_items() {
    let h = harness();
    let doomed = cached_folder(&h, h.root, "Doomed");
    let inner = cached_item(&h, doomed, "inside");
    let loose = cached_item(&h, h.root, "loose");
    let kept = cached_item(&h, h.root, "kept");

    h.manager.handle_message(IncomingMessage::RemoveInventoryObjects {
        folder_ids: vec![doomed],
        item_ids: vec![loose.id],
    });

    let store = h.manager.store();
    assert!(!store.contains(&doomed));
    assert!(!store.contains(&inner.id));
    assert!(!store.contains(&loose.id));
    assert_eq!(store.get_folder(&h.root).unwrap().children, vec![kept.id]);
    assert!(h.datagram.sent().is_empty());
}

#[test]
fn saved_asset_updates_item_and_notifies() {
    let h = harness();
    let item = cached_item(&h, h.root, "Script");
    let new_asset = Uuid::new_v4();
    let (_subscription, events) = record_events(&h.manager);

    h.manager.handle_message(IncomingMessage::SaveAssetIntoInventory {
        item_id: item.id,
        new_asset_id: new_asset,
    });

    assert_eq!(h.manager.store().get_item(&item.id).unwrap().asset_id, new_asset);
    assert_eq!(
        *events.lock(),
        vec![InventoryEvent::SaveAssetToInventory {
            item_id: item.id,
            new_asset_id: new_asset
        }]
    );
}

#[test]
fn script_running_reply_is_forwarded() {
    let h = harness();
    let object = Uuid::new_v4();
    let script = Uuid::new_v4();
    let (_subscription, events) = record_events(&h.manager);

    h.manager
        .request_get_script_running(object, script)
        .unwrap();
    assert_eq!(h.datagram.sent_named("GetScriptRunning").len(), 1);

    h.manager.handle_message(IncomingMessage::ScriptRunningReply {
        object_id: object,
        item_id: script,
        running: true,
        mono: false,
    });

    assert_eq!(
        *events.lock(),
        vec![InventoryEvent::ScriptRunningReply {
            object_id: object,
            script_id: script,
            is_running: true,
            is_mono: false
        }]
    );
}

#[test]
fn purge_empties_folder_but_keeps_it() {
    let h = harness();
    let folder = cached_folder(&h, h.root, "Scratch");
    let sub = cached_folder(&h, folder, "Nested");
    let deep = cached_item(&h, sub, "deep");
    let shallow = cached_item(&h, folder, "shallow");

    h.manager.remove_descendants(folder).unwrap();

    let store = h.manager.store();
    assert!(store.contains_folder(&folder));
    assert!(store.get_contents(&folder).unwrap().is_empty());
    for id in [sub, deep.id, shallow.id] {
        assert!(!store.contains(&id));
    }
    match &h.datagram.sent_named("PurgeInventoryDescendents")[..] {
        [OutgoingMessage::PurgeInventoryDescendents { folder_id, .. }] => assert_eq!(*folder_id, folder),
        other => panic!("unexpected messages {:?}", other),
    }
}

#[test]
fn folder_properties_change_locally_and_on_the_wire() {
    let h = harness();
    let old_parent = cached_folder(&h, h.root, "Old parent");
    let new_parent = cached_folder(&h, h.root, "New parent");
    let folder = cached_folder(&h, old_parent, "Stuff");

    h.manager
        .update_folder_properties(folder, new_parent, "Photos", AssetType::SnapshotFolder)
        .unwrap();

    let store = h.manager.store();
    let updated = store.get_folder(&folder).unwrap();
    assert_eq!(updated.name, "Photos");
    assert_eq!(updated.parent_id, new_parent);
    assert_eq!(updated.preferred_type, AssetType::SnapshotFolder);
    assert!(store.get_contents(&old_parent).unwrap().is_empty());

    match &h.datagram.sent_named("UpdateInventoryFolder")[..] {
        [OutgoingMessage::UpdateInventoryFolder { folders, .. }] => {
            assert_eq!(folders[0].folder_id, folder);
            assert_eq!(folders[0].parent_id, new_parent);
            assert_eq!(folders[0].name, "Photos");
            assert_eq!(folders[0].preferred_type, AssetType::SnapshotFolder.code());
        }
        other => panic!("unexpected messages {:?}", other),
    }
}

#[test]
fn item_update_carries_checksum_of_local_copy() {
    let h = harness();
    let mut item = cached_item(&h, h.root, "Prices");
    item.sale_price = 150;
    item.description = "for sale".to_string();
    let transaction = Uuid::new_v4();

    h.manager
        .request_update_items(std::slice::from_ref(&item), transaction)
        .unwrap();

    assert_eq!(h.manager.store().get_item(&item.id).unwrap().sale_price, 150);
    match &h.datagram.sent_named("UpdateInventoryItem")[..] {
        [OutgoingMessage::UpdateInventoryItem {
            transaction_id,
            items,
            ..
        }] => {
            assert_eq!(*transaction_id, transaction);
            assert_eq!(items[0].item_id, item.id);
            assert_eq!(items[0].crc, item_crc(&item));
            assert_eq!(items[0].sale_price, 150);
        }
        other => panic!("unexpected messages {:?}", other),
    }
}

#[test]
fn rez_request_stamps_transaction_and_position() {
    let h = harness();
    let mut item = cached_item(&h, h.root, "Chair");
    item.asset_type = AssetType::Object;
    item.inventory_type = InventoryType::Object;
    let group = Uuid::new_v4();
    let position = [128.0, 64.0, 22.5];

    let transaction = h
        .manager
        .request_rez_from_inventory(position, &item, group, false)
        .unwrap();

    match &h.datagram.sent_named("RezObject")[..] {
        [OutgoingMessage::RezObject {
            group_id,
            rez,
            item: block,
            ..
        }] => {
            assert_eq!(*group_id, group);
            assert_eq!(rez.ray_start, position);
            assert_eq!(rez.ray_end, position);
            assert!(rez.remove_item);
            assert_eq!(block.item_id, item.id);
            assert_eq!(block.transaction_id, transaction);
            assert_eq!(block.crc, item_crc(&item));
        }
        other => panic!("unexpected messages {:?}", other),
    }
}

#[test]
fn folder_moved_under_uncached_parent_is_removed_with_its_contents() {
    let h = harness();
    let folder = cached_folder(&h, h.root, "Wanderer");
    let inside = cached_item(&h, folder, "luggage");
    let uncached = Uuid::new_v4();

    h.manager.move_folder(folder, uncached).unwrap();
    let store = h.manager.store();
    assert!(!store.contains(&folder));
    assert!(!store.contains(&inside.id));

    h.manager.remove_folder(folder).unwrap();
    assert_eq!(store.len(), 1);

    // the parent arriving later must not bring the removed subtree back
    let mut late = InventoryFolder::new(uncached);
    late.parent_id = h.root;
    store.add(late);
    assert!(store.get_contents(&uncached).unwrap().is_empty());
    assert!(!store.contains(&inside.id));
}

#[test]
fn notecard_copy_over_datagram_reports_completion() {
    let h = harness();
    let copied = Arc::new(Mutex::new(Vec::new()));
    let sink = copied.clone();

    h.manager
        .request_copy_item_from_notecard(
            Uuid::nil(),
            Uuid::new_v4(),
            h.root,
            Uuid::new_v4(),
            Box::new(move |item| sink.lock().push(item.id)),
        )
        .unwrap();
    assert_eq!(h.datagram.sent_named("CopyInventoryFromNotecard").len(), 1);
    assert_eq!(h.manager.pending_callbacks(), 1);

    let new_id = Uuid::new_v4();
    let block = item_block(new_id, h.root, "Landmark", AssetType::Landmark, 3);
    h.manager.handle_message(IncomingMessage::BulkUpdateInventory {
        transaction_id: Uuid::nil(),
        folders: Vec::new(),
        items: vec![block],
    });

    assert_eq!(*copied.lock(), vec![new_id]);
    assert!(h.manager.store().contains_item(&new_id));
    assert_eq!(h.manager.pending_callbacks(), 0);
}

#[test]
fn fetch_reply_does_not_complete_notecard_copy() {
    let h = harness();
    h.manager
        .request_copy_item_from_notecard(
            Uuid::nil(),
            Uuid::new_v4(),
            h.root,
            Uuid::new_v4(),
            Box::new(|_| {}),
        )
        .unwrap();

    h.manager.handle_message(IncomingMessage::FetchInventoryReply {
        agent_id: h.agent_id,
        items: vec![item_block(Uuid::new_v4(), h.root, "Fetched", AssetType::Notecard, 7)],
    });
    assert_eq!(h.manager.pending_callbacks(), 1);
}

#[test]
fn failed_sends_leave_no_pending_callbacks() {
    let h = harness();
    h.datagram.set_failing(true);

    let err = h
        .manager
        .request_create_item(
            h.root,
            "Shirt",
            "",
            AssetType::Clothing,
            Uuid::new_v4(),
            InventoryType::Wearable,
            WearableType::Shirt,
            0,
            Box::new(|_, _| {}),
        )
        .unwrap_err();
    assert!(matches!(err, InventoryError::TransportError(_)));

    let err = h
        .manager
        .request_copy_item(Uuid::new_v4(), h.root, "Copy", h.agent_id, Box::new(|_| {}))
        .unwrap_err();
    assert!(matches!(err, InventoryError::TransportError(_)));

    let err = h
        .manager
        .request_copy_item_from_notecard(
            Uuid::nil(),
            Uuid::new_v4(),
            h.root,
            Uuid::new_v4(),
            Box::new(|_| {}),
        )
        .unwrap_err();
    assert!(matches!(err, InventoryError::TransportError(_)));

    assert_eq!(h.manager.pending_callbacks(), 0);
}
