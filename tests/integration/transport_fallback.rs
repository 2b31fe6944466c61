use crate::integration::support::{harness, harness_with, record_events};
use gridinv::config::InventoryConfig;
use gridinv::inventory::{InventoryFolder, SortOrder};
use gridinv::transport::{HttpOutcome, RequestBody, TransportPreference};
use gridinv::InventoryEvent;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

fn cached_folder(h: &crate::integration::support::Harness) -> Uuid {
    let folder = Uuid::new_v4();
    let mut f = InventoryFolder::new(folder);
    f.parent_id = h.root;
    f.name = "Clothing".to_string();
    h.manager.store().add(f);
    folder
}

#[test]
fn folder_listing_uses_capability_when_available() {
    let h = harness();
    let folder = cached_folder(&h);
    let url = h.capabilities.with_capability("FetchInventoryDescendents2");
    let sub = Uuid::new_v4();
    let shirt = Uuid::new_v4();
    h.capabilities.queue_reply(HttpOutcome::Completed(json!({
        "folders": [{
            "folder_id": folder,
            "owner_id": h.agent_id,
            "version": 2,
            "descendents": 2,
            "categories": [{
                "category_id": sub,
                "parent_id": folder,
                "name": "Shirts",
                "type_default": -1,
                "version": 1
            }],
            "items": [{
                "item_id": shirt,
                "parent_id": folder,
                "name": "Blue shirt",
                "type": 5,
                "inv_type": 18
            }]
        }]
    })));

    let contents = h
        .manager
        .folder_contents(
            folder,
            h.agent_id,
            true,
            true,
            SortOrder::BY_DATE,
            Duration::from_secs(2),
        )
        .expect("listing completes");

    assert_eq!(contents.len(), 2);
    assert!(h.datagram.sent().is_empty());
    let posts = h.capabilities.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, url);
    match &posts[0].1 {
        RequestBody::Osd(body) => {
            assert_eq!(body["folders"][0]["folder_id"], json!(folder));
            assert_eq!(body["folders"][0]["sort_order"], 1);
        }
        other => panic!("unexpected body {:?}", other),
    }
    assert_eq!(h.manager.store().get_folder(&folder).unwrap().version, 2);
}

#[test]
fn refused_capability_falls_back_to_datagram() {
    let h = harness();
    let folder = cached_folder(&h);
    h.capabilities.with_capability("FetchInventoryDescendents2");
    h.capabilities.set_refusing(true);

    h.manager
        .request_folder_contents(folder, h.agent_id, true, true, SortOrder::BY_NAME)
        .unwrap();

    assert_eq!(h.datagram.sent_named("FetchInventoryDescendents").len(), 1);
}

#[test]
fn disabled_http_inventory_ignores_capabilities() {
    let config = InventoryConfig {
        http_inventory: false,
        ..InventoryConfig::default()
    };
    let h = harness_with(config);
    let folder = cached_folder(&h);
    h.capabilities.with_capability("FetchInventoryDescendents2");

    h.manager
        .request_folder_contents(folder, h.agent_id, false, true, SortOrder::BY_NAME)
        .unwrap();

    assert!(h.capabilities.posts().is_empty());
    assert_eq!(h.datagram.sent_named("FetchInventoryDescendents").len(), 1);
}

#[test]
fn http_only_request_without_capability_reports_failure() {
    let h = harness();
    let folder = cached_folder(&h);
    let (_subscription, events) = record_events(&h.manager);

    h.manager
        .request_folder_contents_with(
            folder,
            h.agent_id,
            true,
            true,
            SortOrder::BY_NAME,
            TransportPreference::HttpOnly,
        )
        .unwrap();

    assert!(h.datagram.sent().is_empty());
    assert_eq!(
        *events.lock(),
        vec![InventoryEvent::FolderUpdated {
            folder_id: folder,
            success: false
        }]
    );
}

#[test]
fn failed_capability_request_ends_the_wait_early() {
    let h = harness();
    let folder = cached_folder(&h);
    h.capabilities.with_capability("FetchInventoryDescendents2");
    h.capabilities
        .queue_reply(HttpOutcome::Failed("502 Bad Gateway".to_string()));

    let started = std::time::Instant::now();
    let result = h.manager.folder_contents(
        folder,
        h.agent_id,
        true,
        true,
        SortOrder::BY_NAME,
        Duration::from_secs(10),
    );

    assert!(result.is_none());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(h.datagram.sent().is_empty());
}

#[test]
fn server_reported_bad_folder_fails_the_listing() {
    let h = harness();
    let folder = cached_folder(&h);
    h.capabilities.with_capability("FetchInventoryDescendents2");
    h.capabilities.queue_reply(HttpOutcome::Completed(json!({
        "folders": [],
        "bad_folders": [{ "folder_id": folder, "error": "Unknown folder" }]
    })));
    let (_subscription, events) = record_events(&h.manager);

    h.manager
        .request_folder_contents(folder, h.agent_id, true, true, SortOrder::BY_NAME)
        .unwrap();

    assert!(events.lock().contains(&InventoryEvent::FolderUpdated {
        folder_id: folder,
        success: false
    }));
}

#[test]
fn library_items_use_the_library_capability() {
    let h = harness();
    h.capabilities.with_capability("FetchInventory2");
    let lib_url = h.capabilities.with_capability("FetchLib2");
    let library_owner = Uuid::new_v4();
    let item = Uuid::new_v4();

    h.manager
        .request_fetch_inventory(&[item], &[library_owner])
        .unwrap();

    let posts = h.capabilities.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, lib_url);
}

#[test]
fn fetched_items_over_http_emit_item_received() {
    let h = harness();
    h.capabilities.with_capability("FetchInventory2");
    let item = Uuid::new_v4();
    h.capabilities.queue_reply(HttpOutcome::Completed(json!({
        "items": [{
            "item_id": item,
            "parent_id": h.root,
            "name": "Landmark",
            "type": 3,
            "inv_type": 3
        }]
    })));

    let fetched = h
        .manager
        .fetch_item(item, h.agent_id, Duration::from_secs(2))
        .expect("item arrives");
    assert_eq!(fetched.name, "Landmark");
    assert!(h.manager.store().contains_item(&item));
}

#[test]
fn mismatched_fetch_arguments_are_rejected() {
    let h = harness();
    let err = h
        .manager
        .request_fetch_inventory(&[Uuid::new_v4(), Uuid::new_v4()], &[h.agent_id])
        .unwrap_err();
    assert!(matches!(err, gridinv::InventoryError::InvalidArgument(_)));
}

#[test]
fn notecard_copy_prefers_capability() {
    let h = harness();
    h.capabilities.with_capability("CopyInventoryFromNotecard");
    h.manager
        .request_copy_item_from_notecard(
            Uuid::nil(),
            Uuid::new_v4(),
            h.root,
            Uuid::new_v4(),
            Box::new(|_| {}),
        )
        .unwrap();

    let posts = h.capabilities.posts();
    assert_eq!(posts.len(), 1);
    match &posts[0].1 {
        RequestBody::Osd(body) => assert_eq!(body["callback-id"], 0),
        other => panic!("unexpected body {:?}", other),
    }
    assert_eq!(h.manager.pending_callbacks(), 1);
    assert!(h.datagram.sent().is_empty());

    h.capabilities.set_refusing(true);
    h.manager
        .request_copy_item_from_notecard(
            Uuid::nil(),
            Uuid::new_v4(),
            h.root,
            Uuid::new_v4(),
            Box::new(|_| {}),
        )
        .unwrap();
    assert_eq!(h.manager.pending_callbacks(), 1);
    assert_eq!(h.datagram.sent_named("CopyInventoryFromNotecard").len(), 1);
}
