// Shared fakes for integration tests
//
// Each fake records what the session did to it so tests can assert on call
// counts and payloads without a NATS server.

#![allow(dead_code)]

use anyhow::{bail, Result};
use interview_agent::config::Config;
use interview_agent::engine::{ConversationEngine, EngineEvent, EngineSettings};
use interview_agent::recording::{
    EgressStatus, RecordingArtifact, RecordingBackend, RecordingError, RecordingHandle,
    RecordingInfo, RecordingRequest, StopResult,
};
use interview_agent::room::{RoomEvent, RoomInfo, RoomTransport};
use interview_agent::session::{Session, SessionBackends};
use interview_agent::storage::ObjectStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

pub const ROOM: &str = "room-1";
pub const CANDIDATE: &str = "candidate-1";

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.interview.duration_secs = 1800;
    cfg.interview.poll_interval_secs = 30;
    cfg.interview.grace_period_secs = 10;
    cfg
}

pub fn metadata(candidate_id: &str, job_role: &str) -> Option<String> {
    Some(format!(
        r#"{{"candidate_id":"{}","job_role":"{}"}}"#,
        candidate_id, job_role
    ))
}

pub fn end_call_event() -> RoomEvent {
    RoomEvent::DataReceived {
        topic: "user_actions".to_string(),
        participant: Some(CANDIDATE.to_string()),
        payload: br#"{"type":"USER_ENDED_CALL"}"#.to_vec(),
    }
}

pub fn recording_info(handle: &str, room_name: &str, url: Option<&str>) -> RecordingInfo {
    RecordingInfo {
        handle: RecordingHandle::new(handle),
        room_name: room_name.to_string(),
        status: EgressStatus::Complete,
        started_at: None,
        artifacts: vec![RecordingArtifact {
            filename: format!("{}.mp4", handle),
            location: None,
            download_url: url.map(str::to_string),
            size: None,
        }],
    }
}

pub fn transcription(participant: &str, text: &str, is_final: bool) -> RoomEvent {
    RoomEvent::Transcription {
        participant: participant.to_string(),
        text: text.to_string(),
        is_final,
    }
}

// ============================================================================
// Room
// ============================================================================

pub struct FakeRoom {
    participants: Vec<String>,
    events: Mutex<Option<mpsc::Receiver<RoomEvent>>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub published: Mutex<Vec<(String, Vec<u8>)>>,
    pub subscribed: Mutex<Vec<String>>,
    pub fail_connect: AtomicBool,
    pub fail_publish: AtomicBool,
}

impl FakeRoom {
    pub fn new(participants: &[&str]) -> (Arc<Self>, mpsc::Sender<RoomEvent>) {
        let (tx, rx) = mpsc::channel(100);
        let room = Arc::new(Self {
            participants: participants.iter().map(|p| p.to_string()).collect(),
            events: Mutex::new(Some(rx)),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            subscribed: Mutex::new(Vec::new()),
            fail_connect: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
        });
        (room, tx)
    }

    pub fn published_on(&self, topic: &str) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

#[async_trait::async_trait]
impl RoomTransport for FakeRoom {
    async fn connect(&self) -> Result<RoomInfo> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            bail!("room unreachable");
        }
        Ok(RoomInfo {
            name: ROOM.to_string(),
            sid: Some("RM_1".to_string()),
            metadata: None,
            participants: self.participants.clone(),
        })
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn publish_data(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            bail!("data channel closed");
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe_track(&self, track_sid: &str) -> Result<()> {
        self.subscribed.lock().unwrap().push(track_sid.to_string());
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::Receiver<RoomEvent>> {
        self.events.lock().unwrap().take()
    }

    fn room_name(&self) -> &str {
        ROOM
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct FakeEngine {
    events: Mutex<Option<mpsc::Receiver<EngineEvent>>>,
    pub starts: AtomicUsize,
    pub closes: AtomicUsize,
    pub replies: AtomicUsize,
    pub messages: Mutex<Vec<String>>,
    pub fail_start: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> (Arc<Self>, mpsc::Sender<EngineEvent>) {
        let (tx, rx) = mpsc::channel(100);
        let engine = Arc::new(Self {
            events: Mutex::new(Some(rx)),
            starts: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            replies: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            fail_start: AtomicBool::new(false),
        });
        (engine, tx)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ConversationEngine for FakeEngine {
    async fn start(&self, _room_name: &str) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            bail!("engine refused session");
        }
        Ok(())
    }

    async fn add_assistant_message(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn generate_reply(&self) -> Result<()> {
        self.replies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::Receiver<EngineEvent>> {
        self.events.lock().unwrap().take()
    }

    fn name(&self) -> &str {
        "fake-engine"
    }
}

// ============================================================================
// Recording
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StartBehavior {
    Succeed,
    Quota,
    Reject,
}

pub struct FakeRecorder {
    start: StartBehavior,
    artifacts: Vec<RecordingArtifact>,
    pub requests: Mutex<Vec<RecordingRequest>>,
    pub stops: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_stop: AtomicBool,
    /// Jobs returned by `list_recordings`
    pub listed: Mutex<Vec<RecordingInfo>>,
    /// Room filter of every listing request
    pub list_queries: Mutex<Vec<Option<String>>>,
}

impl FakeRecorder {
    pub fn new(start: StartBehavior) -> Arc<Self> {
        Arc::new(Self {
            start,
            artifacts: Vec::new(),
            requests: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            fail_stop: AtomicBool::new(false),
            listed: Mutex::new(Vec::new()),
            list_queries: Mutex::new(Vec::new()),
        })
    }

    pub fn with_download_url(url: &str) -> Arc<Self> {
        Arc::new(Self {
            start: StartBehavior::Succeed,
            artifacts: vec![RecordingArtifact {
                filename: "EG_1.mp4".to_string(),
                location: None,
                download_url: Some(url.to_string()),
                size: Some(1024),
            }],
            requests: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            fail_stop: AtomicBool::new(false),
            listed: Mutex::new(Vec::new()),
            list_queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl RecordingBackend for FakeRecorder {
    async fn start_recording(
        &self,
        request: &RecordingRequest,
    ) -> std::result::Result<RecordingHandle, RecordingError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.start {
            StartBehavior::Succeed => Ok(RecordingHandle::new("EG_1")),
            StartBehavior::Quota => Err(RecordingError::from_backend_message(
                "resource_exhausted: concurrent egress limit exceeded",
            )),
            StartBehavior::Reject => Err(RecordingError::from_backend_message("room not found")),
        }
    }

    async fn stop_recording(&self, _handle: &RecordingHandle) -> Result<StopResult> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            bail!("egress service unavailable");
        }
        Ok(StopResult {
            status: EgressStatus::Complete,
            artifacts: self.artifacts.clone(),
        })
    }

    async fn list_recordings(&self, room_name: Option<&str>) -> Result<Vec<RecordingInfo>> {
        self.list_queries
            .lock()
            .unwrap()
            .push(room_name.map(str::to_string));
        Ok(self
            .listed
            .lock()
            .unwrap()
            .iter()
            .filter(|r| room_name.map_or(true, |room| r.room_name == room))
            .cloned()
            .collect())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake-egress"
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(bytes, _)| String::from_utf8(bytes.clone()).unwrap())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("bucket unavailable");
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Backends
// ============================================================================

pub struct FakeBackends {
    pub room: Arc<FakeRoom>,
    pub engine: Arc<FakeEngine>,
    pub recorder: Arc<FakeRecorder>,
    pub store: Arc<MemoryStore>,
    pub settings: Mutex<Option<EngineSettings>>,
    /// When set, building an engine waits for one notification
    pub engine_gate: Mutex<Option<Arc<Notify>>>,
}

/// Handles a test keeps to drive and inspect a session
pub struct Harness {
    pub backends: FakeBackends,
    pub room_tx: mpsc::Sender<RoomEvent>,
    pub engine_tx: mpsc::Sender<EngineEvent>,
}

impl Harness {
    pub fn new(start: StartBehavior) -> Self {
        Self::with_recorder(FakeRecorder::new(start))
    }

    pub fn with_recorder(recorder: Arc<FakeRecorder>) -> Self {
        let (room, room_tx) = FakeRoom::new(&[CANDIDATE]);
        let (engine, engine_tx) = FakeEngine::new();
        Self {
            backends: FakeBackends {
                room,
                engine,
                recorder,
                store: MemoryStore::new(),
                settings: Mutex::new(None),
                engine_gate: Mutex::new(None),
            },
            room_tx,
            engine_tx,
        }
    }

    pub fn room(&self) -> &FakeRoom {
        &self.backends.room
    }

    pub fn engine(&self) -> &FakeEngine {
        &self.backends.engine
    }

    pub fn recorder(&self) -> &FakeRecorder {
        &self.backends.recorder
    }

    pub fn store(&self) -> &MemoryStore {
        &self.backends.store
    }
}

#[async_trait::async_trait]
impl SessionBackends for FakeBackends {
    async fn engine(
        &self,
        _session: &Session,
        settings: EngineSettings,
    ) -> Result<Arc<dyn ConversationEngine>> {
        let gate = self.engine_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        *self.settings.lock().unwrap() = Some(settings);
        Ok(self.engine.clone())
    }

    async fn room(&self, _session: &Session) -> Result<Arc<dyn RoomTransport>> {
        Ok(self.room.clone())
    }

    async fn recorder(&self, _session: &Session) -> Result<Arc<dyn RecordingBackend>> {
        Ok(self.recorder.clone())
    }

    fn storage(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }
}
