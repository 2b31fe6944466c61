use crate::integration::support::harness;
use gridinv::inventory::{AssetType, InventoryType, Permissions};
use gridinv::sync::UploadResult;
use gridinv::transport::{HttpOutcome, RequestBody};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn capture() -> (Arc<Mutex<Option<UploadResult>>>, gridinv::sync::UploadCallback) {
    let slot = Arc::new(Mutex::new(None));
    let sink = slot.clone();
    (slot, Box::new(move |result| *sink.lock() = Some(result)))
}

#[test]
fn upload_follows_uploader_until_complete() {
    let h = harness();
    let url = h.capabilities.with_capability("NewFileAgentInventory");
    let asset = Uuid::new_v4();
    let item = Uuid::new_v4();
    h.capabilities.queue_reply(HttpOutcome::Completed(
        json!({ "state": "upload", "uploader": "https://upload.example/1" }),
    ));
    h.capabilities.queue_reply(HttpOutcome::Completed(
        json!({ "state": "upload", "uploader": "https://upload.example/2" }),
    ));
    h.capabilities.queue_reply(HttpOutcome::Completed(json!({
        "state": "complete",
        "new_asset": asset,
        "new_inventory_item": item
    })));
    let (result, callback) = capture();
    let data = b"texture bytes".to_vec();

    h.manager
        .request_create_item_from_asset(
            data.clone(),
            "Sunset",
            "A photo",
            AssetType::Texture,
            InventoryType::Texture,
            h.root,
            &Permissions::default(),
            callback,
        )
        .unwrap();

    let result = result.lock().clone().expect("upload finished");
    assert!(result.success);
    assert_eq!(result.status, "complete");
    assert_eq!(result.asset_id, Some(asset));
    assert_eq!(result.item_id, Some(item));

    let posts = h.capabilities.posts();
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0].0, url);
    match &posts[0].1 {
        RequestBody::Osd(body) => {
            assert_eq!(body["asset_type"], "texture");
            assert_eq!(body["name"], "Sunset");
        }
        other => panic!("unexpected body {:?}", other),
    }
    assert_eq!(posts[1].0, "https://upload.example/1");
    assert_eq!(posts[2].0, "https://upload.example/2");
    assert_eq!(posts[1].1, RequestBody::Bytes(data.clone()));
    assert_eq!(posts[2].1, RequestBody::Bytes(data));

    // No FetchInventory2 capability, so the refresh goes out as a datagram
    assert_eq!(h.datagram.sent_named("FetchInventory").len(), 1);
}

#[test]
fn unexpected_state_fails_the_upload() {
    let h = harness();
    h.capabilities.with_capability("UpdateNotecardAgentInventory");
    h.capabilities
        .queue_reply(HttpOutcome::Completed(json!({ "state": "error" })));
    let (result, callback) = capture();

    h.manager
        .request_upload_notecard_asset(b"hello".to_vec(), Uuid::new_v4(), callback)
        .unwrap();

    let result = result.lock().clone().expect("upload finished");
    assert!(!result.success);
    assert_eq!(result.status, "error");
    assert!(h.datagram.sent().is_empty());
}

#[test]
fn missing_upload_capability_fails_immediately() {
    let h = harness();
    let (result, callback) = capture();

    h.manager
        .request_update_script_agent_inventory(b"default {}".to_vec(), Uuid::new_v4(), true, callback)
        .unwrap();

    let result = result.lock().clone().expect("callback ran");
    assert!(!result.success);
    assert!(result.status.contains("UpdateScriptAgent"));
    assert!(h.capabilities.posts().is_empty());
}

#[test]
fn task_script_upload_reports_compile_errors() {
    let h = harness();
    h.capabilities.with_capability("UpdateScriptTask");
    let script = Uuid::new_v4();
    let task = Uuid::new_v4();
    h.capabilities.queue_reply(HttpOutcome::Completed(
        json!({ "state": "upload", "uploader": "https://upload.example/s" }),
    ));
    h.capabilities.queue_reply(HttpOutcome::Completed(json!({
        "state": "complete",
        "new_asset": Uuid::new_v4(),
        "compiled": false,
        "errors": ["(3, 4) : ERROR : Syntax error"]
    })));
    let (result, callback) = capture();

    h.manager
        .request_update_script_task(b"broken".to_vec(), script, task, false, true, callback)
        .unwrap();

    let result = result.lock().clone().expect("upload finished");
    assert!(result.success);
    assert_eq!(result.item_id, Some(script));
    assert_eq!(result.compiled, Some(false));
    assert_eq!(result.errors.len(), 1);

    match &h.capabilities.posts()[0].1 {
        RequestBody::Osd(body) => {
            assert_eq!(body["target"], "lsl2");
            assert_eq!(body["task_id"], json!(task));
        }
        other => panic!("unexpected body {:?}", other),
    }
    // Task items are not mirrored, so nothing is refreshed
    assert!(h.datagram.sent().is_empty());
}

#[test]
fn cancelled_upload_reports_failure() {
    let h = harness();
    h.capabilities.with_capability("UpdateNotecardTaskInventory");
    h.capabilities.queue_reply(HttpOutcome::Cancelled);
    let (result, callback) = capture();

    h.manager
        .request_update_notecard_task(b"text".to_vec(), Uuid::new_v4(), Uuid::new_v4(), callback)
        .unwrap();

    let result = result.lock().clone().expect("callback ran");
    assert!(!result.success);
}
