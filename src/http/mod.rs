//! HTTP control API for interview sessions
//!
//! - POST /interviews/start - Dispatch an interview into a room
//! - POST /interviews/:room/end - Ask a running interview to end
//! - GET /interviews/:room/status - Query session status
//! - GET /interviews/:room/transcript - Get the transcript so far
//! - GET /recordings?room=<name> - List recording jobs
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{
    EndInterviewResponse, ErrorResponse, RecordingsQuery, RecordingsResponse,
    StartInterviewRequest, StartInterviewResponse,
};
pub use routes::create_router;
pub use state::AppState;
