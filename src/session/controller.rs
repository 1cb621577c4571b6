use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backends::SessionBackends;
use super::cleanup::{CleanupReport, CleanupSequencer, CleanupTargets};
use super::events::{EventHandler, EventKind, SessionEvent, Subscriptions};
use super::monitor::{DurationMonitor, MonitorExit, MonitorState};
use super::session::{EndReason, Session};
use crate::config::Config;
use crate::engine::{ConversationEngine, EngineEvent, EngineSettings};
use crate::prompts;
use crate::recording::RecordingCoordinator;
use crate::room::{InterviewJob, JobContext, RoomEvent, RoomInfo, RoomTransport};
use crate::transcript::{TranscriptAggregator, TranscriptStats};

/// Result of a finished interview
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub session_id: String,
    pub candidate_id: String,
    pub job_role: String,
    pub room_name: String,
    pub cleanup: CleanupReport,
}

/// Point-in-time view of a running interview
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub room_name: String,
    pub candidate_id: String,
    pub job_role: String,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: Option<f64>,
    pub budget_secs: u64,
    pub monitor: MonitorState,
    pub recording_active: bool,
    pub terminating: bool,
    pub end_reason: Option<EndReason>,
    pub transcript: TranscriptStats,
}

/// Drives one interview from connect to teardown
pub struct InterviewController {
    config: Arc<Config>,
    session: Arc<Session>,
    engine: Arc<dyn ConversationEngine>,
    room: Arc<dyn RoomTransport>,
    transcript: Arc<TranscriptAggregator>,
    recorder: Arc<RecordingCoordinator>,
    subscriptions: Arc<Subscriptions>,
    monitor: DurationMonitor,
    cleanup: Arc<CleanupSequencer>,
}

impl InterviewController {
    /// Resolve the job and build every collaborator. Any failure here is
    /// fatal: nothing has connected yet, so there is nothing to clean up.
    pub async fn new(
        config: Arc<Config>,
        job: InterviewJob,
        backends: &dyn SessionBackends,
    ) -> Result<Self> {
        let context = JobContext::resolve(&job, &config.interview.default_role);
        if !prompts::is_known_role(&context.job_role) {
            warn!(
                "Unknown job role {}, using {} instructions",
                context.job_role,
                prompts::DEFAULT_ROLE
            );
        }
        let settings = EngineSettings {
            instructions: prompts::instructions_for(&context.job_role),
            voice: config.interview.voice.clone(),
        };

        let session = Arc::new(Session::new(context, config.interview.duration()));
        info!(
            "Preparing interview {} (candidate {}, role {}, room {})",
            session.id(),
            session.candidate_id(),
            session.job_role(),
            session.room_name()
        );

        let engine = backends
            .engine(&session, settings)
            .await
            .context("Failed to create conversational engine")?;
        let room = backends
            .room(&session)
            .await
            .context("Failed to create room transport")?;
        let recorder = Arc::new(RecordingCoordinator::new(
            backends
                .recorder(&session)
                .await
                .context("Failed to create recording backend")?,
            config.recording.clone(),
        ));
        let transcript = Arc::new(TranscriptAggregator::new(format!(
            "{}_{}",
            session.candidate_id(),
            Utc::now().format("%Y%m%d_%H%M%S")
        )));
        let subscriptions = Arc::new(Subscriptions::new());

        let monitor = DurationMonitor::new(
            session.clone(),
            engine.clone(),
            config.interview.poll_interval(),
            config.interview.grace_period(),
            config.interview.closing_message.clone(),
        );

        let cleanup = Arc::new(CleanupSequencer::new(
            session.clone(),
            CleanupTargets {
                recorder: recorder.clone(),
                transcript: transcript.clone(),
                room: room.clone(),
                engine: engine.clone(),
                storage: backends.storage(),
                subscriptions: subscriptions.clone(),
            },
            config.storage.namespace.clone(),
            config.interview.task_join_timeout(),
        ));

        Ok(Self {
            config,
            session,
            engine,
            room,
            transcript,
            recorder,
            subscriptions,
            monitor,
            cleanup,
        })
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.clone()
    }

    pub fn transcript(&self) -> Arc<TranscriptAggregator> {
        self.transcript.clone()
    }

    pub fn cleanup_sequencer(&self) -> Arc<CleanupSequencer> {
        self.cleanup.clone()
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.monitor.state()
    }

    /// Ask the running interview to end; cleanup follows on the run task
    pub fn request_end(&self, reason: EndReason) -> bool {
        self.session.terminate(reason)
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.session.id().to_string(),
            room_name: self.session.room_name().to_string(),
            candidate_id: self.session.candidate_id().to_string(),
            job_role: self.session.job_role().to_string(),
            started_at: self.session.started_at(),
            elapsed_secs: self.session.elapsed().map(|d| d.as_secs_f64()),
            budget_secs: self.session.budget().as_secs(),
            monitor: self.monitor.state(),
            recording_active: self.recorder.is_active().await,
            terminating: self.session.is_terminating(),
            end_reason: self.session.end_reason(),
            transcript: self.transcript.stats().await,
        }
    }

    /// Run the interview to completion.
    ///
    /// Connect failures return immediately. Once connected, every exit path
    /// goes through the cleanup sequencer before this returns.
    pub async fn start_interview(&self) -> Result<SessionOutcome> {
        info!(
            "--- STARTING INTERVIEW (candidate: {}) ---",
            self.session.candidate_id()
        );

        let room_info = match self.room.connect().await {
            Ok(info) => info,
            Err(e) => {
                // No cleanup runs for a session that never connected
                self.recorder.close().await;
                return Err(e.context("Failed to connect to room"));
            }
        };
        info!("Connected to room: {}", room_info.name);

        let result = self.drive(room_info).await;

        let reason = match &result {
            Ok(reason) => *reason,
            Err(e) => {
                error!("Interview {} failed: {:#}", self.session.id(), e);
                EndReason::SetupFailed
            }
        };

        let cleanup = match self.cleanup.cleanup(reason).await {
            Some(report) => report,
            None => self.cleanup.wait_for_report().await,
        };

        result.map(|_| SessionOutcome {
            session_id: self.session.id().to_string(),
            candidate_id: self.session.candidate_id().to_string(),
            job_role: self.session.job_role().to_string(),
            room_name: self.session.room_name().to_string(),
            cleanup,
        })
    }

    async fn drive(&self, room_info: RoomInfo) -> Result<EndReason> {
        if let Some(first) = room_info.participants.first() {
            self.session.set_primary_identity(first);
        }

        self.wire_events().await;

        let recording_degraded = !self.start_recording().await;

        self.engine
            .start(self.session.room_name())
            .await
            .context("Failed to start conversational engine")?;
        self.session.mark_started();
        info!("Engine session started via {}", self.engine.name());

        if recording_degraded {
            if let Err(e) = self
                .engine
                .add_assistant_message(&self.config.interview.recording_unavailable_message)
                .await
            {
                warn!("Failed to add recording notice: {:#}", e);
            }
        }

        self.engine
            .add_assistant_message(&self.config.interview.greeting)
            .await
            .context("Failed to add greeting")?;
        self.engine
            .generate_reply()
            .await
            .context("Failed to generate greeting")?;

        match self.monitor.run().await {
            MonitorExit::Expired => info!("Interview {} timed out", self.session.id()),
            MonitorExit::Terminated => info!("Interview {} ended early", self.session.id()),
        }

        Ok(self.session.end_reason().unwrap_or(EndReason::Timeout))
    }

    /// Returns false when the interview continues unrecorded
    async fn start_recording(&self) -> bool {
        if !self.config.recording.enabled {
            info!("Recording disabled by configuration");
            return true;
        }

        match self
            .recorder
            .start(self.session.room_name(), self.session.candidate_id())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Continuing interview without recording: {}", e);
                false
            }
        }
    }

    async fn wire_events(&self) {
        let terminator = |reason: EndReason| -> Arc<dyn EventHandler> {
            Arc::new(Terminator {
                session: self.session.clone(),
                reason,
            })
        };

        self.subscriptions.register(
            EventKind::Transcript,
            Arc::new(TranscriptForwarder {
                transcript: self.transcript.clone(),
            }),
        );
        self.subscriptions
            .register(EventKind::EndSignal, terminator(EndReason::UserEndedCall));
        self.subscriptions
            .register(EventKind::RoomClosed, terminator(EndReason::RoomClosed));
        self.subscriptions
            .register(EventKind::EngineFailed, terminator(EndReason::EngineFailed));

        let peers: Arc<dyn EventHandler> = Arc::new(PeerWatcher {
            session: self.session.clone(),
        });
        self.subscriptions.register(EventKind::PeerJoined, peers.clone());
        self.subscriptions.register(EventKind::PeerDisconnect, peers);

        self.subscriptions.register(
            EventKind::TrackPublished,
            Arc::new(TrackSubscriber {
                room: self.room.clone(),
            }),
        );

        match self.room.take_events() {
            Some(rx) => {
                let pump = pump_room_events(
                    rx,
                    self.session.clone(),
                    self.subscriptions.clone(),
                    self.config.interview.agent_identity.clone(),
                );
                self.session.spawn("room-events", pump).await;
            }
            None => warn!("Room event stream unavailable"),
        }

        match self.engine.take_events() {
            Some(rx) => {
                let pump =
                    pump_engine_events(rx, self.session.clone(), self.subscriptions.clone());
                self.session.spawn("engine-events", pump).await;
            }
            None => warn!("Engine event stream unavailable"),
        }
    }
}

async fn pump_room_events(
    mut rx: mpsc::Receiver<RoomEvent>,
    session: Arc<Session>,
    subscriptions: Arc<Subscriptions>,
    agent_identity: String,
) {
    loop {
        let event = tokio::select! {
            _ = session.terminated() => break,
            event = rx.recv() => event,
        };
        let Some(event) = event else {
            break;
        };
        if let Some(event) =
            SessionEvent::from_room(event, &agent_identity, session.primary_identity())
        {
            subscriptions.dispatch(&event).await;
        }
    }
}

async fn pump_engine_events(
    mut rx: mpsc::Receiver<EngineEvent>,
    session: Arc<Session>,
    subscriptions: Arc<Subscriptions>,
) {
    loop {
        let event = tokio::select! {
            _ = session.terminated() => break,
            event = rx.recv() => event,
        };
        let Some(event) = event else {
            break;
        };
        if let Some(event) = SessionEvent::from_engine(event) {
            subscriptions.dispatch(&event).await;
        }
    }
}

struct TranscriptForwarder {
    transcript: Arc<TranscriptAggregator>,
}

#[async_trait::async_trait]
impl EventHandler for TranscriptForwarder {
    async fn handle(&self, event: &SessionEvent) -> Result<()> {
        if let SessionEvent::Transcript(t) = event {
            self.transcript.record(t.speaker, &t.text, t.is_final).await;
        }
        Ok(())
    }
}

/// Ends the session with a fixed reason
struct Terminator {
    session: Arc<Session>,
    reason: EndReason,
}

#[async_trait::async_trait]
impl EventHandler for Terminator {
    async fn handle(&self, event: &SessionEvent) -> Result<()> {
        match event {
            SessionEvent::RoomClosed { reason } => {
                warn!("Room closed: {}", reason.as_deref().unwrap_or("no reason given"))
            }
            SessionEvent::EngineFailed { message } => error!("Engine failed: {}", message),
            _ => info!("End signal received"),
        }
        self.session.terminate(self.reason);
        Ok(())
    }
}

/// Tracks the primary participant and ends the session when they leave
struct PeerWatcher {
    session: Arc<Session>,
}

#[async_trait::async_trait]
impl EventHandler for PeerWatcher {
    async fn handle(&self, event: &SessionEvent) -> Result<()> {
        match event {
            SessionEvent::PeerJoined(peer) => {
                info!("Participant joined: {}", peer.identity);
                self.session.set_primary_identity(&peer.identity);
            }
            SessionEvent::PeerDisconnect(peer) if self.session.is_primary(&peer.identity) => {
                info!("Primary participant {} left", peer.identity);
                self.session.terminate(EndReason::PeerDisconnected);
            }
            SessionEvent::PeerDisconnect(peer) => {
                info!("Participant {} left", peer.identity);
            }
            _ => {}
        }
        Ok(())
    }
}

struct TrackSubscriber {
    room: Arc<dyn RoomTransport>,
}

#[async_trait::async_trait]
impl EventHandler for TrackSubscriber {
    async fn handle(&self, event: &SessionEvent) -> Result<()> {
        if let SessionEvent::TrackPublished(track) = event {
            info!(
                "Subscribing to track {} from {}",
                track.track_sid, track.participant
            );
            self.room.subscribe_track(&track.track_sid).await?;
        }
        Ok(())
    }
}
