use crate::config::Config;
use crate::evaluation::Evaluator;
use crate::recording::RecordingBackend;
use crate::session::{InterviewController, SessionBackends};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Running interviews (room_name → controller)
    pub sessions: Arc<RwLock<HashMap<String, Arc<InterviewController>>>>,

    /// Rooms whose controller is still being built
    pub starting: Arc<Mutex<HashSet<String>>>,

    pub backends: Arc<dyn SessionBackends>,

    pub config: Arc<Config>,

    /// Scores finished interviews when `evaluation.auto_evaluate` is set
    pub evaluator: Option<Arc<dyn Evaluator>>,

    /// Answers recording listings; not tied to any one session
    pub recordings: Option<Arc<dyn RecordingBackend>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, backends: Arc<dyn SessionBackends>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            starting: Arc::new(Mutex::new(HashSet::new())),
            backends,
            config,
            evaluator: None,
            recordings: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_recordings(mut self, recordings: Arc<dyn RecordingBackend>) -> Self {
        self.recordings = Some(recordings);
        self
    }

    /// Claim a room for a new interview. False when the room already has a
    /// running interview or another start in progress.
    pub async fn reserve(&self, room_name: &str) -> bool {
        let sessions = self.sessions.read().await;
        let mut starting = self.starting.lock().await;
        !sessions.contains_key(room_name) && starting.insert(room_name.to_string())
    }

    /// Register the built controller and drop the reservation
    pub async fn register(&self, room_name: &str, controller: Arc<InterviewController>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(room_name.to_string(), controller);
        self.starting.lock().await.remove(room_name);
    }

    pub async fn release(&self, room_name: &str) {
        self.starting.lock().await.remove(room_name);
    }

    pub async fn get(&self, room_name: &str) -> Option<Arc<InterviewController>> {
        self.sessions.read().await.get(room_name).cloned()
    }
}
