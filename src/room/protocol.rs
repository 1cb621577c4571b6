//! Data-channel messages exchanged with the candidate's client

use serde::{Deserialize, Serialize};

/// Inbound topic for client actions
pub const USER_ACTIONS_TOPIC: &str = "user_actions";

/// Outbound topic for interview status updates
pub const INTERVIEW_STATUS_TOPIC: &str = "interview_status";

/// Action sent by the candidate's client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UserAction {
    #[serde(rename = "USER_ENDED_CALL")]
    UserEndedCall,
    #[serde(other)]
    Unrecognized,
}

impl UserAction {
    /// `None` when the payload is not a JSON action
    pub fn parse(payload: &[u8]) -> Option<Self> {
        serde_json::from_slice(payload).ok()
    }
}

/// Completion notice sent to the candidate before the agent leaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewEndedMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub room_id: String,
    pub recording_url: Option<String>,
    pub message: String,
}

impl InterviewEndedMessage {
    pub const KIND: &'static str = "INTERVIEW_ENDED";

    pub fn completed(
        room_id: impl Into<String>,
        recording_url: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            status: "completed".to_string(),
            room_id: room_id.into(),
            recording_url,
            message: message.into(),
        }
    }
}
