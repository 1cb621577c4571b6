//! Media room transport seam
//!
//! The transport joins the room, reports participant/track/data events and
//! carries data-channel messages to the candidate's client.

mod job;
mod nats;
pub mod protocol;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::mpsc;

pub use job::{InterviewJob, JobContext};
pub use nats::NatsRoomTransport;

/// Event observed in the room
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    ParticipantConnected {
        identity: String,
    },
    ParticipantDisconnected {
        identity: String,
    },
    TrackPublished {
        participant: String,
        track_sid: String,
        kind: Option<String>,
    },
    DataReceived {
        topic: String,
        participant: Option<String>,
        payload: Vec<u8>,
    },
    /// Speech-to-text produced by the room for a participant's audio
    Transcription {
        participant: String,
        text: String,
        is_final: bool,
    },
    /// The transport lost the room
    Disconnected {
        reason: Option<String>,
    },
}

/// Room state returned on connect
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoomInfo {
    pub name: String,
    pub sid: Option<String>,
    /// JSON-encoded room metadata
    pub metadata: Option<String>,
    /// Remote participants already present
    pub participants: Vec<String>,
}

#[async_trait::async_trait]
pub trait RoomTransport: Send + Sync {
    async fn connect(&self) -> Result<RoomInfo>;

    async fn disconnect(&self) -> Result<()>;

    /// Publish a data-channel message on `topic`
    async fn publish_data(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Make sure a published track is subscribed to
    async fn subscribe_track(&self, track_sid: &str) -> Result<()>;

    /// Event stream; `None` once taken
    fn take_events(&self) -> Option<mpsc::Receiver<RoomEvent>>;

    fn room_name(&self) -> &str;
}
