use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::stats::TranscriptStats;

/// Who said something
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Interviewer,
    Candidate,
    Unknown,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Interviewer => "Interviewer",
            Speaker::Candidate => "Candidate",
            Speaker::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One coalesced speaker turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,

    /// Space-joined text of every final result in this turn
    pub text: String,

    /// When the first result of this turn arrived
    pub timestamp: DateTime<Utc>,
}

/// JSON export of a finished transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptExport {
    pub interview_id: String,
    pub exported_at: DateTime<Utc>,
    pub statistics: TranscriptStats,
    pub transcript: Vec<TranscriptEntry>,
}

/// Accumulates final speech results into ordered speaker turns
pub struct TranscriptAggregator {
    interview_id: String,
    entries: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl TranscriptAggregator {
    pub fn new(interview_id: impl Into<String>) -> Self {
        Self {
            interview_id: interview_id.into(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn interview_id(&self) -> &str {
        &self.interview_id
    }

    /// Record one speech result.
    ///
    /// Interim results and blank text are dropped. A final result from the
    /// same speaker as the last stored entry is appended to that entry;
    /// anything else starts a new entry.
    pub async fn record(&self, speaker: Speaker, text: &str, is_final: bool) {
        if !is_final {
            return;
        }

        if text.trim().is_empty() {
            debug!("Dropping empty transcript result from {}", speaker);
            return;
        }

        let mut entries = self.entries.lock().await;
        match entries.last_mut() {
            Some(last) if last.speaker == speaker => {
                last.text.push(' ');
                last.text.push_str(text);
            }
            _ => entries.push(TranscriptEntry {
                speaker,
                text: text.to_string(),
                timestamp: Utc::now(),
            }),
        }

        debug!("Transcript: [{}] {}", speaker, text);
    }

    /// Copy of the entries recorded so far
    pub async fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Render the transcript as `[Speaker]: text` blocks separated by blank lines
    pub async fn format(&self) -> String {
        format_entries(&self.snapshot().await)
    }

    pub async fn stats(&self) -> TranscriptStats {
        TranscriptStats::from_entries(&self.snapshot().await)
    }

    pub async fn export(&self) -> TranscriptExport {
        let transcript = self.snapshot().await;
        TranscriptExport {
            interview_id: self.interview_id.clone(),
            exported_at: Utc::now(),
            statistics: TranscriptStats::from_entries(&transcript),
            transcript,
        }
    }
}

pub(crate) fn format_entries(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("[{}]: {}", entry.speaker, entry.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
