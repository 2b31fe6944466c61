use gridinv::config::InventoryConfig;
use gridinv::error::TransportError;
use gridinv::inventory::{AssetType, InventoryFolder};
use gridinv::protocol::{FolderBlock, ItemBlock, OutgoingMessage};
use gridinv::transport::{
    CapabilityTransport, DatagramTransport, FileCallback, HttpCallback, HttpOutcome, RequestBody,
    TaskFileSource,
};
use gridinv::types::ZERO_ID;
use gridinv::{InventoryEvent, InventoryManager, SessionInfo, Subscription, Transports};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Datagram channel that records every message
#[derive(Default)]
pub struct RecordingDatagram {
    sent: Mutex<Vec<OutgoingMessage>>,
    arrived: Condvar,
    failing: AtomicBool,
}

impl RecordingDatagram {
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_named(&self, name: &str) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.name() == name)
            .cloned()
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Block until the `nth` (zero-based) message called `name` has been sent
    pub fn wait_for(&self, name: &str, nth: usize, timeout: Duration) -> Option<OutgoingMessage> {
        let deadline = Instant::now() + timeout;
        let mut sent = self.sent.lock();
        loop {
            if let Some(message) = sent.iter().filter(|m| m.name() == name).nth(nth) {
                return Some(message.clone());
            }
            if self.arrived.wait_until(&mut sent, deadline).timed_out() {
                return None;
            }
        }
    }
}

impl DatagramTransport for RecordingDatagram {
    fn send(&self, message: OutgoingMessage) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("circuit closed".to_string()));
        }
        self.sent.lock().push(message);
        self.arrived.notify_all();
        Ok(())
    }
}

/// Capability transport with a fixed URL table and canned replies
///
/// Replies are delivered synchronously from `post`, in queue order. A post
/// with no queued reply never completes.
#[derive(Default)]
pub struct ScriptedCapabilities {
    urls: Mutex<HashMap<String, String>>,
    replies: Mutex<VecDeque<HttpOutcome>>,
    posts: Mutex<Vec<(String, RequestBody)>>,
    refusing: AtomicBool,
}

impl ScriptedCapabilities {
    pub fn with_capability(&self, name: &str) -> String {
        let url = format!("https://sim.example/cap/{}", name);
        self.urls.lock().insert(name.to_string(), url.clone());
        url
    }

    pub fn queue_reply(&self, outcome: HttpOutcome) {
        self.replies.lock().push_back(outcome);
    }

    pub fn posts(&self) -> Vec<(String, RequestBody)> {
        self.posts.lock().clone()
    }

    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }
}

impl CapabilityTransport for ScriptedCapabilities {
    fn capability_uri(&self, name: &str) -> Option<String> {
        self.urls.lock().get(name).cloned()
    }

    fn post(
        &self,
        url: &str,
        body: RequestBody,
        _timeout: Duration,
        on_result: HttpCallback,
    ) -> Result<(), TransportError> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::Http("connection refused".to_string()));
        }
        self.posts.lock().push((url.to_string(), body));
        let reply = self.replies.lock().pop_front();
        if let Some(outcome) = reply {
            on_result(outcome);
        }
        Ok(())
    }
}

/// Task-inventory files served from memory
#[derive(Default)]
pub struct StaticFiles {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl StaticFiles {
    pub fn insert(&self, name: &str, data: &str) {
        self.files
            .lock()
            .insert(name.to_string(), data.as_bytes().to_vec());
    }
}

impl TaskFileSource for StaticFiles {
    fn request_file(&self, filename: &str, on_done: FileCallback) -> Result<(), TransportError> {
        let data = self.files.lock().get(filename).cloned();
        on_done(data);
        Ok(())
    }
}

pub struct Harness {
    pub manager: InventoryManager,
    pub datagram: Arc<RecordingDatagram>,
    pub capabilities: Arc<ScriptedCapabilities>,
    pub files: Arc<StaticFiles>,
    pub agent_id: Uuid,
    pub root: Uuid,
}

pub fn harness() -> Harness {
    harness_with(InventoryConfig::default())
}

/// Manager for a fresh agent whose inventory root is already cached
pub fn harness_with(config: InventoryConfig) -> Harness {
    let datagram = Arc::new(RecordingDatagram::default());
    let capabilities = Arc::new(ScriptedCapabilities::default());
    let files = Arc::new(StaticFiles::default());
    let agent_id = Uuid::new_v4();
    let root = Uuid::new_v4();

    let mut session = SessionInfo::new(agent_id, Uuid::new_v4(), root);
    session.agent_name = "Test Resident".to_string();
    let transports = Transports {
        datagram: datagram.clone(),
        capabilities: capabilities.clone(),
        task_files: files.clone(),
    };
    let manager = InventoryManager::new(session, config, transports);

    let mut root_folder = InventoryFolder::new(root);
    root_folder.parent_id = ZERO_ID;
    root_folder.owner_id = agent_id;
    root_folder.name = "My Inventory".to_string();
    root_folder.preferred_type = AssetType::RootFolder;
    manager.store().add(root_folder);

    Harness {
        manager,
        datagram,
        capabilities,
        files,
        agent_id,
        root,
    }
}

/// Collect every event emitted while the subscription lives
pub fn record_events(manager: &InventoryManager) -> (Subscription, Arc<Mutex<Vec<InventoryEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscription = manager.subscribe(move |event| sink.lock().push(event.clone()));
    (subscription, events)
}

pub fn folder_block(id: Uuid, parent: Uuid, name: &str, preferred_type: AssetType) -> FolderBlock {
    FolderBlock {
        folder_id: id,
        parent_id: parent,
        preferred_type: preferred_type.code(),
        name: name.to_string(),
    }
}

pub fn item_block(id: Uuid, folder: Uuid, name: &str, asset_type: AssetType, inv_type: i8) -> ItemBlock {
    ItemBlock {
        item_id: id,
        folder_id: folder,
        callback_id: 0,
        transaction_id: Uuid::nil(),
        creator_id: Uuid::nil(),
        owner_id: Uuid::nil(),
        group_id: Uuid::nil(),
        base_mask: 0x7fff_ffff,
        owner_mask: 0x7fff_ffff,
        group_mask: 0,
        everyone_mask: 0,
        next_owner_mask: 0x0008_2000,
        group_owned: false,
        asset_id: Uuid::new_v4(),
        asset_type: asset_type.code(),
        inv_type,
        flags: 0,
        sale_type: 0,
        sale_price: 0,
        name: name.to_string(),
        description: String::new(),
        creation_date: 1_700_000_000,
        crc: 0,
    }
}
