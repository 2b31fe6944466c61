use crate::integration::support::harness;
use gridinv::inventory::AssetType;
use gridinv::protocol::{IncomingMessage, OutgoingMessage};
use gridinv::task_inventory::parse_task_inventory;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

const OBJECT: &str = "5b4a4c1e-2b67-4d5c-9a55-8b3f1e0d2c11";
const ITEM: &str = "9f0c2d44-71a3-4b1e-8c6e-3d2a1b0f9e88";

fn listing() -> String {
    format!(
        "\tinv_object\t0\n\
         \t{{\n\
         \t\tobj_id\t{OBJECT}\n\
         \t\tparent_id\t00000000-0000-0000-0000-000000000000\n\
         \t\ttype\tcategory\n\
         \t\tname\tContents|\n\
         \t}}\n\
         \tinv_item\t0\n\
         \t{{\n\
         \t\titem_id\t{ITEM}\n\
         \t\tparent_id\t{OBJECT}\n\
         \tpermissions 0\n\
         \t{{\n\
         \t\tbase_mask\t7fffffff\n\
         \t\towner_mask\t0008e000\n\
         \t\tgroup_mask\t00000000\n\
         \t\teveryone_mask\t00000000\n\
         \t\tnext_owner_mask\t00082000\n\
         \t}}\n\
         \t\ttype\tlsltext\n\
         \t\tinv_type\tscript\n\
         \t\tname\tDoor script|extra\n\
         \t\tdesc\tOpens the door|\n\
         \t}}\n"
    )
}

#[test]
fn two_record_listing_yields_folder_and_item() {
    let nodes = parse_task_inventory(&listing());
    assert_eq!(nodes.len(), 2);

    let folder = nodes[0].as_folder().expect("first record is a folder");
    assert_eq!(folder.name, "Contents");
    assert_eq!(folder.id, Uuid::parse_str(OBJECT).unwrap());

    let item = nodes[1].as_item().expect("second record is an item");
    assert_eq!(item.name, "Door script");
    assert_eq!(item.description, "Opens the door");
    assert_eq!(item.parent_id, folder.id);
    assert_eq!(item.asset_type, AssetType::LSLText);
    assert_eq!(item.permissions.base_mask, 0x7fff_ffff);
    assert_eq!(item.permissions.owner_mask, 0x0008_e000);
    assert_eq!(item.permissions.next_owner_mask, 0x0008_2000);
    assert!(item.permissions.owner_can_copy());
}

#[test]
fn object_inventory_is_downloaded_and_parsed() {
    let h = harness();
    let object_id = Uuid::new_v4();
    h.files.insert("inventory_42.tmp", &listing());

    let responder = {
        let manager = h.manager.clone();
        let datagram = h.datagram.clone();
        thread::spawn(move || {
            let Some(OutgoingMessage::RequestTaskInventory { object_local_id, .. }) =
                datagram.wait_for("RequestTaskInventory", 0, Duration::from_secs(5))
            else {
                panic!("task inventory not requested");
            };
            assert_eq!(object_local_id, 42);
            manager.handle_message(IncomingMessage::ReplyTaskInventory {
                task_id: object_id,
                serial: 3,
                filename: "inventory_42.tmp".to_string(),
            });
        })
    };

    let nodes = h
        .manager
        .get_task_inventory(object_id, 42, Duration::from_secs(5))
        .expect("listing arrives");
    responder.join().unwrap();

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1].name(), "Door script");
}

#[test]
fn object_without_inventory_yields_empty_listing() {
    let h = harness();
    let object_id = Uuid::new_v4();

    let responder = {
        let manager = h.manager.clone();
        let datagram = h.datagram.clone();
        thread::spawn(move || {
            datagram
                .wait_for("RequestTaskInventory", 0, Duration::from_secs(5))
                .expect("task inventory requested");
            manager.handle_message(IncomingMessage::ReplyTaskInventory {
                task_id: object_id,
                serial: 0,
                filename: String::new(),
            });
        })
    };

    let nodes = h
        .manager
        .get_task_inventory(object_id, 7, Duration::MAX)
        .expect("reply arrives");
    responder.join().unwrap();
    assert!(nodes.is_empty());
}

#[test]
fn missing_task_file_yields_no_listing() {
    let h = harness();
    let object_id = Uuid::new_v4();

    let responder = {
        let manager = h.manager.clone();
        let datagram = h.datagram.clone();
        thread::spawn(move || {
            datagram
                .wait_for("RequestTaskInventory", 0, Duration::from_secs(5))
                .expect("task inventory requested");
            manager.handle_message(IncomingMessage::ReplyTaskInventory {
                task_id: object_id,
                serial: 1,
                filename: "gone.tmp".to_string(),
            });
        })
    };

    let nodes = h
        .manager
        .get_task_inventory(object_id, 9, Duration::from_secs(5));
    responder.join().unwrap();
    assert!(nodes.is_none());
}
