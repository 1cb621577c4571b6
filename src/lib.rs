pub mod config;
pub mod engine;
pub mod evaluation;
pub mod http;
pub mod nats;
pub mod prompts;
pub mod recording;
pub mod room;
pub mod session;
pub mod storage;
pub mod transcript;

pub use config::Config;
pub use engine::{ConversationEngine, EngineEvent, EngineSettings, NatsConversationEngine};
pub use evaluation::{Evaluation, Evaluator, NatsEvaluator, Recommendation};
pub use http::{create_router, AppState};
pub use nats::NatsClient;
pub use recording::{RecordingBackend, RecordingCoordinator, RecordingError, RecordingReport};
pub use room::{InterviewJob, JobContext, RoomEvent, RoomTransport};
pub use session::{
    CleanupReport, CleanupSequencer, DurationMonitor, EndReason, InterviewController, NatsBackends,
    Session, SessionBackends, SessionOutcome,
};
pub use storage::{LocalObjectStore, ObjectStore};
pub use transcript::{Speaker, TranscriptAggregator, TranscriptEntry};
