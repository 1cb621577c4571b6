//! Interview session lifecycle
//!
//! `InterviewController` connects to the room, wires event subscriptions,
//! starts recording and the engine, greets the candidate and then waits on the
//! `DurationMonitor`. Every way out (timeout, end-call signal, candidate
//! leaving, errors) funnels into one `CleanupSequencer` run guarded by the
//! `Session`.

mod backends;
mod cleanup;
mod controller;
mod events;
mod monitor;
#[allow(clippy::module_inception)]
mod session;

pub use backends::{NatsBackends, SessionBackends};
pub use cleanup::{CleanupReport, CleanupSequencer, CleanupTargets};
pub use controller::{InterviewController, SessionOutcome, SessionStatus};
pub use events::{
    EndSignalEvent, EventHandler, EventKind, PeerDisconnectEvent, PeerJoinedEvent, SessionEvent,
    Subscriptions, TrackPublishedEvent, TranscriptEvent,
};
pub use monitor::{DurationMonitor, MonitorExit, MonitorState};
pub use session::{EndReason, Session, MAX_SESSION_TASKS};
