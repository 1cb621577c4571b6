//! Room recording
//!
//! The `RecordingCoordinator` owns at most one in-flight recording job per
//! session and talks to an external egress service through `RecordingBackend`.

mod backend;
mod coordinator;
mod nats;

pub use backend::{
    EgressStatus, RecordingArtifact, RecordingBackend, RecordingError, RecordingHandle,
    RecordingInfo, RecordingRequest, StopResult,
};
pub use coordinator::{destination_key, resolve_destination, RecordingCoordinator, RecordingReport};
pub use nats::NatsEgressBackend;
