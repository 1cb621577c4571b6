use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use super::events::Subscriptions;
use super::session::{EndReason, Session};
use crate::engine::ConversationEngine;
use crate::recording::{RecordingCoordinator, RecordingReport};
use crate::room::protocol::{InterviewEndedMessage, INTERVIEW_STATUS_TOPIC};
use crate::room::RoomTransport;
use crate::storage::{self, ObjectStore};
use crate::transcript::TranscriptAggregator;

/// What teardown managed to do
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub reason: EndReason,
    pub recording: RecordingReport,
    pub notified: bool,
    /// Key the transcript was stored under, if the upload succeeded
    pub transcript_key: Option<String>,
    pub transcript_entries: usize,
    pub disconnected: bool,
    /// Steps that failed, in order
    pub failures: Vec<String>,
}

/// Everything teardown needs to touch
pub struct CleanupTargets {
    pub recorder: Arc<RecordingCoordinator>,
    pub transcript: Arc<TranscriptAggregator>,
    pub room: Arc<dyn RoomTransport>,
    pub engine: Arc<dyn ConversationEngine>,
    pub storage: Arc<dyn ObjectStore>,
    pub subscriptions: Arc<Subscriptions>,
}

/// Exactly-once session teardown.
///
/// Any number of triggers may call `cleanup`; the session's guard lets the
/// first one through. Each step is independent: a failing step is logged and
/// recorded in the report, and the next step still runs.
pub struct CleanupSequencer {
    session: Arc<Session>,
    targets: CleanupTargets,
    namespace: String,
    task_join_timeout: Duration,
    report: OnceLock<CleanupReport>,
    done: Notify,
}

impl CleanupSequencer {
    pub fn new(
        session: Arc<Session>,
        targets: CleanupTargets,
        namespace: impl Into<String>,
        task_join_timeout: Duration,
    ) -> Self {
        Self {
            session,
            targets,
            namespace: namespace.into(),
            task_join_timeout,
            report: OnceLock::new(),
            done: Notify::new(),
        }
    }

    /// Tear the session down. Returns `None` for every caller but the first.
    pub async fn cleanup(&self, reason: EndReason) -> Option<CleanupReport> {
        if !self.session.begin_cleanup() {
            debug!("Cleanup already claimed for {}", self.session.id());
            return None;
        }

        self.session.terminate(reason);
        let reason = self.session.end_reason().unwrap_or(reason);
        info!(
            "Session {} cleanup starting ({})",
            self.session.id(),
            reason.as_str()
        );

        let removed = self.targets.subscriptions.unregister_all();
        debug!("Removed {} event subscriptions", removed);

        let mut failures = Vec::new();

        // 1. Recording first, so the transcript can reference its final id
        let recording = match self.targets.recorder.stop().await {
            Ok(report) => report,
            Err(e) => {
                error!("Recording stop failed: {:#}", e);
                failures.push(format!("recording: {:#}", e));
                RecordingReport {
                    handle: self.targets.recorder.handle().await,
                    ..RecordingReport::default()
                }
            }
        };

        // 2. Tell the candidate while the room is still reachable
        let notified = match self.notify_peer(&recording).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Completion notice not delivered: {:#}", e);
                failures.push(format!("notify: {:#}", e));
                false
            }
        };

        // 3. Transcript
        let transcript_entries = self.targets.transcript.len().await;
        let transcript_key = match self.persist_transcript(&recording).await {
            Ok(key) => Some(key),
            Err(e) => {
                error!("Transcript upload failed: {:#}", e);
                failures.push(format!("transcript: {:#}", e));
                None
            }
        };

        // 4. Leave
        if let Err(e) = self.targets.engine.close().await {
            warn!("Engine close failed: {:#}", e);
            failures.push(format!("engine: {:#}", e));
        }
        let disconnected = match self.targets.room.disconnect().await {
            Ok(()) => true,
            Err(e) => {
                error!("Room disconnect failed: {:#}", e);
                failures.push(format!("disconnect: {:#}", e));
                false
            }
        };

        self.session.join_tasks(self.task_join_timeout).await;

        let report = CleanupReport {
            reason,
            recording,
            notified,
            transcript_key,
            transcript_entries,
            disconnected,
            failures,
        };

        info!(
            "Session {} cleanup complete ({} failed step(s))",
            self.session.id(),
            report.failures.len()
        );

        let _ = self.report.set(report.clone());
        self.done.notify_waiters();

        Some(report)
    }

    pub fn report(&self) -> Option<&CleanupReport> {
        self.report.get()
    }

    /// Wait until whichever caller won the guard has finished
    pub async fn wait_for_report(&self) -> CleanupReport {
        loop {
            let notified = self.done.notified();
            if let Some(report) = self.report.get() {
                return report.clone();
            }
            notified.await;
        }
    }

    async fn notify_peer(&self, recording: &RecordingReport) -> Result<()> {
        let url = recording.download_url().map(str::to_string);
        let message = match (&url, &recording.handle) {
            (Some(_), _) => "Interview completed. Your recording is available.",
            (None, Some(_)) => "Interview completed. Recording saved, URL not yet available.",
            (None, None) => "Interview completed.",
        };

        let notice = InterviewEndedMessage::completed(self.session.room_name(), url, message);
        let payload = serde_json::to_vec(&notice)?;

        self.targets
            .room
            .publish_data(INTERVIEW_STATUS_TOPIC, payload)
            .await
            .context("Failed to publish interview status")?;

        info!("Sent {} to {}", InterviewEndedMessage::KIND, self.session.room_name());
        Ok(())
    }

    async fn persist_transcript(&self, recording: &RecordingReport) -> Result<String> {
        let recording_id = recording.handle.as_ref().map(|h| h.as_str());
        let room_id = self.session.room_name();

        let key = storage::transcript_key(&self.namespace, room_id, recording_id);
        let text = self.targets.transcript.format().await;
        self.targets
            .storage
            .put(&key, text.into_bytes(), storage::TEXT_PLAIN)
            .await
            .with_context(|| format!("Failed to store transcript {}", key))?;

        info!("Transcript saved to {}", key);

        let export_key = storage::transcript_export_key(&self.namespace, room_id, recording_id);
        let export = self.targets.transcript.export().await;
        match serde_json::to_vec_pretty(&export) {
            Ok(bytes) => {
                if let Err(e) = self
                    .targets
                    .storage
                    .put(&export_key, bytes, storage::APPLICATION_JSON)
                    .await
                {
                    warn!("Transcript export not stored: {:#}", e);
                }
            }
            Err(e) => warn!("Transcript export not serialized: {}", e),
        }

        Ok(key)
    }
}
