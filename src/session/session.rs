use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, error, info, warn};

use crate::room::JobContext;

/// Upper bound on background tasks a session may own at once
pub const MAX_SESSION_TASKS: usize = 16;

/// Why an interview ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Duration budget exhausted
    Timeout,
    /// Candidate pressed "end call"
    UserEndedCall,
    /// Candidate left the room
    PeerDisconnected,
    /// Transport lost the room
    RoomClosed,
    /// Engine reported an unrecoverable error
    EngineFailed,
    /// Ended by an operator through the control API
    Stopped,
    /// A step after connecting failed
    SetupFailed,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Timeout => "timeout",
            EndReason::UserEndedCall => "user_ended_call",
            EndReason::PeerDisconnected => "peer_disconnected",
            EndReason::RoomClosed => "room_closed",
            EndReason::EngineFailed => "engine_failed",
            EndReason::Stopped => "stopped",
            EndReason::SetupFailed => "setup_failed",
        }
    }
}

struct SessionStart {
    at: DateTime<Utc>,
    instant: Instant,
}

/// One interview instance.
///
/// Holds the identifiers resolved for the job, the live-engine start mark,
/// the single cleanup guard and the termination signal every trigger shares.
/// A session is never reused.
pub struct Session {
    id: String,
    context: JobContext,
    budget: Duration,
    started: OnceLock<SessionStart>,
    started_signal: Notify,
    cleanup_started: AtomicBool,
    shutdown: CancellationToken,
    end_reason: OnceLock<EndReason>,
    primary_identity: OnceLock<String>,
    tasks: Mutex<JoinSet<()>>,
}

impl Session {
    pub fn new(context: JobContext, budget: Duration) -> Self {
        Self {
            id: format!("interview-{}", uuid::Uuid::new_v4()),
            context,
            budget,
            started: OnceLock::new(),
            started_signal: Notify::new(),
            cleanup_started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            end_reason: OnceLock::new(),
            primary_identity: OnceLock::new(),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    pub fn candidate_id(&self) -> &str {
        &self.context.candidate_id
    }

    pub fn room_name(&self) -> &str {
        &self.context.room_name
    }

    pub fn job_role(&self) -> &str {
        &self.context.job_role
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Record that the live engine is running. Only the first call counts.
    pub fn mark_started(&self) -> bool {
        let first = self
            .started
            .set(SessionStart {
                at: Utc::now(),
                instant: Instant::now(),
            })
            .is_ok();
        if first {
            info!("Session {} started", self.id);
            self.started_signal.notify_waiters();
        }
        first
    }

    /// Resolves on the next `mark_started`. Create it before checking
    /// `elapsed` so a concurrent start is not missed.
    pub fn started(&self) -> Notified<'_> {
        self.started_signal.notified()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started.get().map(|s| s.at)
    }

    /// Time since `mark_started`; `None` while the engine is not yet live
    pub fn elapsed(&self) -> Option<Duration> {
        self.started.get().map(|s| s.instant.elapsed())
    }

    /// Request the end of the session. The first reason wins.
    pub fn terminate(&self, reason: EndReason) -> bool {
        let first = self.end_reason.set(reason).is_ok();
        if first {
            info!("Session {} ending: {}", self.id, reason.as_str());
        } else {
            debug!(
                "Session {} already ending, ignoring {}",
                self.id,
                reason.as_str()
            );
        }
        self.shutdown.cancel();
        first
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason.get().copied()
    }

    pub fn is_terminating(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once `terminate` has been called
    pub fn terminated(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Claim the cleanup guard; true for exactly one caller
    pub fn begin_cleanup(&self) -> bool {
        self.cleanup_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn cleanup_started(&self) -> bool {
        self.cleanup_started.load(Ordering::SeqCst)
    }

    /// The first remote participant seen becomes the primary one
    pub fn set_primary_identity(&self, identity: &str) -> bool {
        let first = self.primary_identity.set(identity.to_string()).is_ok();
        if first {
            info!("Primary participant: {}", identity);
        }
        first
    }

    pub fn primary_identity(&self) -> Option<&str> {
        self.primary_identity.get().map(String::as_str)
    }

    pub fn is_primary(&self, identity: &str) -> bool {
        self.primary_identity() == Some(identity)
    }

    /// Run a background task owned by this session.
    ///
    /// Refused once cleanup has begun or when `MAX_SESSION_TASKS` are live.
    pub async fn spawn<F>(&self, name: &str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cleanup_started() {
            warn!("Not spawning {}: session {} is cleaning up", name, self.id);
            return false;
        }

        let mut tasks = self.tasks.lock().await;
        if tasks.len() >= MAX_SESSION_TASKS {
            warn!("Not spawning {}: session task limit reached", name);
            return false;
        }

        tasks.spawn(task);
        debug!("Spawned session task {} ({} live)", name, tasks.len());
        true
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wait for session tasks to finish, aborting whatever outlives `timeout`
    pub async fn join_tasks(&self, timeout: Duration) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        if tasks.is_empty() {
            return;
        }

        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        error!("Session task panicked: {}", e);
                    }
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "Aborting {} session task(s) still running after {:?}",
                tasks.len(),
                timeout
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
    }
}
