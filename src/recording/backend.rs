use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identifier of an in-flight recording job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingHandle(String);

impl RecordingHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status reported by the egress service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EgressStatus {
    Starting,
    Active,
    Ending,
    Complete,
    Failed,
    Aborted,
    LimitReached,
    Unknown,
}

impl EgressStatus {
    /// Accepts both `EGRESS_COMPLETE` and `complete` spellings
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.strip_prefix("egress_").unwrap_or(&normalized) {
            "starting" => Self::Starting,
            "active" => Self::Active,
            "ending" => Self::Ending,
            "complete" => Self::Complete,
            "failed" => Self::Failed,
            "aborted" => Self::Aborted,
            "limit_reached" => Self::LimitReached,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed | Self::Aborted | Self::LimitReached
        )
    }
}

/// One output file produced by a recording job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingArtifact {
    pub filename: String,
    pub location: Option<String>,
    pub download_url: Option<String>,
    pub size: Option<u64>,
}

/// Parameters for a room-composite recording
#[derive(Debug, Clone)]
pub struct RecordingRequest {
    pub room_name: String,

    /// Destination key; `{handle}` is substituted by the backend
    pub destination_key: String,

    pub layout: String,
    pub audio_only: bool,
}

/// What the backend reported when asked to stop
#[derive(Debug, Clone)]
pub struct StopResult {
    pub status: EgressStatus,

    /// May be empty while the backend is still processing the file
    pub artifacts: Vec<RecordingArtifact>,
}

/// A recording job as reported by the listing query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingInfo {
    pub handle: RecordingHandle,
    pub room_name: String,
    pub status: EgressStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub artifacts: Vec<RecordingArtifact>,
}

impl RecordingInfo {
    /// Artifacts that can be fetched over HTTP
    pub fn downloads(&self) -> impl Iterator<Item = (&str, &str)> {
        self.artifacts
            .iter()
            .filter_map(|a| a.download_url.as_deref().map(|url| (a.filename.as_str(), url)))
    }
}

#[derive(Debug, Error)]
pub enum RecordingError {
    /// Concurrent-recording or usage limit hit; the interview continues unrecorded
    #[error("recording quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("recording backend rejected the request: {0}")]
    Rejected(String),

    #[error("recording backend unreachable: {0}")]
    Transport(String),

    #[error("recording backend connection closed")]
    Closed,
}

impl RecordingError {
    /// Classify an error message returned by the egress service
    pub fn from_backend_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("resource_exhausted") || lower.contains("limit exceeded") {
            Self::QuotaExceeded(message)
        } else {
            Self::Rejected(message)
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}

/// Egress/recording service
///
/// Implementations:
/// - `NatsEgressBackend`: request/reply against an egress bridge over NATS
#[async_trait::async_trait]
pub trait RecordingBackend: Send + Sync {
    /// Begin recording the room; returns the job handle
    async fn start_recording(
        &self,
        request: &RecordingRequest,
    ) -> std::result::Result<RecordingHandle, RecordingError>;

    /// Ask the service to end the job and report its status
    async fn stop_recording(&self, handle: &RecordingHandle) -> Result<StopResult>;

    /// Recording jobs known to the service, optionally only for one room
    async fn list_recordings(&self, room_name: Option<&str>) -> Result<Vec<RecordingInfo>>;

    /// Release any connection held by this backend
    async fn close(&self) -> Result<()>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
