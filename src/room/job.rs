use serde::{Deserialize, Serialize};
use tracing::warn;

/// A request to run one interview in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewJob {
    pub job_id: String,
    pub room_name: String,
    /// JSON-encoded room metadata carrying `candidate_id` and `job_role`
    #[serde(default)]
    pub metadata: Option<String>,
}

impl InterviewJob {
    pub fn new(room_name: impl Into<String>, metadata: Option<String>) -> Self {
        Self {
            job_id: format!("job-{}", uuid::Uuid::new_v4()),
            room_name: room_name.into(),
            metadata,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RoomMetadata {
    #[serde(default)]
    candidate_id: Option<String>,
    #[serde(default)]
    job_role: Option<String>,
}

/// Identifiers resolved from a job and its room metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobContext {
    pub job_id: String,
    pub room_name: String,
    pub candidate_id: String,
    pub job_role: String,

    /// True when metadata had no candidate id and one was generated
    pub candidate_id_generated: bool,
}

impl JobContext {
    pub fn resolve(job: &InterviewJob, default_role: &str) -> Self {
        let metadata = match job.metadata.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str::<RoomMetadata>(raw)
                .unwrap_or_else(|e| {
                    warn!("Ignoring malformed room metadata for {}: {}", job.room_name, e);
                    RoomMetadata::default()
                }),
            _ => RoomMetadata::default(),
        };

        let candidate_id = non_blank(metadata.candidate_id);
        let candidate_id_generated = candidate_id.is_none();

        Self {
            job_id: job.job_id.clone(),
            room_name: job.room_name.clone(),
            candidate_id: candidate_id
                .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4())),
            job_role: non_blank(metadata.job_role).unwrap_or_else(|| default_role.to_string()),
            candidate_id_generated,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
