//! JSON wire messages exchanged with the room, egress and evaluation bridges

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomConnectRequest {
    pub room_name: String,
    pub identity: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RoomConnectReply {
    pub room_name: String,
    #[serde(default)]
    pub sid: Option<String>,
    /// JSON-encoded room metadata
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Room event as published by the room bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEventMessage {
    ParticipantConnected {
        identity: String,
    },
    ParticipantDisconnected {
        identity: String,
    },
    TrackPublished {
        participant: String,
        track_sid: String,
        #[serde(default)]
        kind: Option<String>,
    },
    DataReceived {
        topic: String,
        #[serde(default)]
        participant: Option<String>,
        /// Base64-encoded payload bytes
        payload: String,
    },
    Transcription {
        participant: String,
        text: String,
        is_final: bool,
    },
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataPublishMessage {
    pub topic: String,
    /// Base64-encoded payload bytes
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackSubscribeMessage {
    pub track_sid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomLeaveMessage {
    pub identity: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EgressStartRequest {
    pub room_name: String,
    /// Destination path; `{handle}` is replaced by the backend with the egress id
    pub filepath: String,
    pub layout: String,
    pub audio_only: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EgressStartReply {
    #[serde(default)]
    pub egress_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EgressStopRequest {
    pub egress_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EgressStopReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub file_results: Vec<FileResultMessage>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Listing query; an absent room lists every recording the service knows
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EgressListRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EgressListReply {
    #[serde(default)]
    pub items: Vec<EgressInfoMessage>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressInfoMessage {
    pub egress_id: String,
    pub room_name: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub file_results: Vec<FileResultMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResultMessage {
    pub filename: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationGenerateRequest {
    pub candidate_id: String,
    pub job_role: String,
    pub prompt: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EvaluationGenerateReply {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
