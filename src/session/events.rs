use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, warn};

use crate::engine::EngineEvent;
use crate::room::protocol::{UserAction, USER_ACTIONS_TOPIC};
use crate::room::RoomEvent;
use crate::transcript::Speaker;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub speaker: Speaker,
    pub text: String,
    pub is_final: bool,
}

/// Candidate asked to end the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndSignalEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerJoinedEvent {
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDisconnectEvent {
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPublishedEvent {
    pub participant: String,
    pub track_sid: String,
}

/// Everything the controller reacts to during a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Transcript(TranscriptEvent),
    EndSignal(EndSignalEvent),
    PeerJoined(PeerJoinedEvent),
    PeerDisconnect(PeerDisconnectEvent),
    TrackPublished(TrackPublishedEvent),
    RoomClosed { reason: Option<String> },
    EngineFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transcript,
    EndSignal,
    PeerJoined,
    PeerDisconnect,
    TrackPublished,
    RoomClosed,
    EngineFailed,
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Transcript(_) => EventKind::Transcript,
            SessionEvent::EndSignal(_) => EventKind::EndSignal,
            SessionEvent::PeerJoined(_) => EventKind::PeerJoined,
            SessionEvent::PeerDisconnect(_) => EventKind::PeerDisconnect,
            SessionEvent::TrackPublished(_) => EventKind::TrackPublished,
            SessionEvent::RoomClosed { .. } => EventKind::RoomClosed,
            SessionEvent::EngineFailed { .. } => EventKind::EngineFailed,
        }
    }

    /// Translate a room event.
    ///
    /// `agent_identity` is the agent's own participant; `primary` is the
    /// candidate once known. Transcriptions from anyone else are `Unknown`.
    pub fn from_room(
        event: RoomEvent,
        agent_identity: &str,
        primary: Option<&str>,
    ) -> Option<Self> {
        match event {
            RoomEvent::ParticipantConnected { identity } => {
                Some(SessionEvent::PeerJoined(PeerJoinedEvent { identity }))
            }
            RoomEvent::ParticipantDisconnected { identity } => {
                Some(SessionEvent::PeerDisconnect(PeerDisconnectEvent { identity }))
            }
            RoomEvent::TrackPublished {
                participant,
                track_sid,
                ..
            } => Some(SessionEvent::TrackPublished(TrackPublishedEvent {
                participant,
                track_sid,
            })),
            RoomEvent::DataReceived { topic, payload, .. } => {
                if topic != USER_ACTIONS_TOPIC {
                    debug!("Ignoring data message on topic {}", topic);
                    return None;
                }
                match UserAction::parse(&payload) {
                    Some(UserAction::UserEndedCall) => {
                        Some(SessionEvent::EndSignal(EndSignalEvent))
                    }
                    other => {
                        debug!("Ignoring user action {:?}", other);
                        None
                    }
                }
            }
            RoomEvent::Transcription {
                participant,
                text,
                is_final,
            } => {
                let speaker = if participant == agent_identity {
                    Speaker::Interviewer
                } else if participant.is_empty() {
                    Speaker::Unknown
                } else if primary.map_or(true, |p| p == participant) {
                    Speaker::Candidate
                } else {
                    Speaker::Unknown
                };
                Some(SessionEvent::Transcript(TranscriptEvent {
                    speaker,
                    text,
                    is_final,
                }))
            }
            RoomEvent::Disconnected { reason } => Some(SessionEvent::RoomClosed { reason }),
        }
    }

    pub fn from_engine(event: EngineEvent) -> Option<Self> {
        match event {
            EngineEvent::UserTranscript { text, is_final } => {
                Some(SessionEvent::Transcript(TranscriptEvent {
                    speaker: Speaker::Candidate,
                    text,
                    is_final,
                }))
            }
            EngineEvent::AssistantItemAdded { role, text } if role == "assistant" => {
                Some(SessionEvent::Transcript(TranscriptEvent {
                    speaker: Speaker::Interviewer,
                    text,
                    is_final: true,
                }))
            }
            EngineEvent::AssistantItemAdded { role, .. } => {
                debug!("Ignoring conversation item with role {}", role);
                None
            }
            EngineEvent::Error {
                message,
                recoverable: true,
            } => {
                warn!("Engine reported recoverable error: {}", message);
                None
            }
            EngineEvent::Error { message, .. } => Some(SessionEvent::EngineFailed { message }),
        }
    }
}

#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &SessionEvent) -> Result<()>;
}

struct Subscription {
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
}

/// The controller's event wiring: (kind, handler) pairs.
///
/// Cleared during teardown; once cleared, events are no longer delivered and
/// new registrations are refused.
#[derive(Default)]
pub struct Subscriptions {
    entries: RwLock<Vec<Subscription>>,
    closed: AtomicBool,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            warn!("Not registering {:?} handler: subscriptions closed", kind);
            return false;
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription { kind, handler });
        true
    }

    /// Drop every subscription; returns how many were removed
    pub fn unregister_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every handler of its kind; returns the number invoked
    pub async fn dispatch(&self, event: &SessionEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in &handlers {
            if let Err(e) = handler.handle(event).await {
                error!("{:?} handler failed: {:#}", kind, e);
            }
        }

        handlers.len()
    }
}
