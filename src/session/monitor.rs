use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::session::{EndReason, Session};
use crate::engine::ConversationEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Engine not yet confirmed live
    Waiting,
    Running,
    /// Budget exhausted, closing the interview
    Expired,
    Stopped,
}

impl MonitorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Waiting,
            1 => Self::Running,
            2 => Self::Expired,
            _ => Self::Stopped,
        }
    }
}

/// How the monitor loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// The monitor ended the session on timeout
    Expired,
    /// Something else ended the session first
    Terminated,
}

/// Ends the session once its elapsed time reaches the budget
pub struct DurationMonitor {
    session: Arc<Session>,
    engine: Arc<dyn ConversationEngine>,
    poll_interval: Duration,
    grace_period: Duration,
    closing_message: Option<String>,
    state: AtomicU8,
}

impl DurationMonitor {
    pub fn new(
        session: Arc<Session>,
        engine: Arc<dyn ConversationEngine>,
        poll_interval: Duration,
        grace_period: Duration,
        closing_message: Option<String>,
    ) -> Self {
        Self {
            session,
            engine,
            poll_interval,
            grace_period,
            closing_message,
            state: AtomicU8::new(MonitorState::Waiting as u8),
        }
    }

    pub fn state(&self) -> MonitorState {
        MonitorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: MonitorState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Poll until the budget is spent or the session is terminated elsewhere.
    ///
    /// Never runs cleanup itself; on expiry it only requests termination
    /// through the session, which every other trigger shares.
    pub async fn run(&self) -> MonitorExit {
        let budget = self.session.budget();

        loop {
            let started = self.session.started();
            let waiting = self.session.elapsed().is_none();
            if !waiting {
                self.set_state(MonitorState::Running);
            }

            tokio::select! {
                biased;
                _ = self.session.terminated() => {
                    self.set_state(MonitorState::Stopped);
                    return MonitorExit::Terminated;
                }
                _ = started, if waiting => continue,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let Some(elapsed) = self.session.elapsed() else {
                continue;
            };

            if elapsed < budget {
                continue;
            }

            self.set_state(MonitorState::Expired);
            info!(
                "Interview limit reached for {} ({}s elapsed, budget {}s)",
                self.session.id(),
                elapsed.as_secs(),
                budget.as_secs()
            );

            if !self.session.is_terminating() {
                self.say_goodbye().await;
            }

            let exit = if self.session.terminate(EndReason::Timeout) {
                MonitorExit::Expired
            } else {
                MonitorExit::Terminated
            };
            self.set_state(MonitorState::Stopped);
            return exit;
        }
    }

    async fn say_goodbye(&self) {
        let Some(message) = &self.closing_message else {
            return;
        };

        let sent = async {
            self.engine.add_assistant_message(message).await?;
            self.engine.generate_reply().await
        }
        .await;

        if let Err(e) = sent {
            warn!("Failed to deliver closing message: {:#}", e);
            return;
        }

        // Give the engine time to speak, unless something else ends the session first
        tokio::select! {
            _ = self.session.terminated() => {}
            _ = tokio::time::sleep(self.grace_period) => {}
        }
    }
}
