use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview control
        .route("/interviews/start", post(handlers::start_interview))
        .route("/interviews/:room_name/end", post(handlers::end_interview))
        // Interview queries
        .route(
            "/interviews/:room_name/status",
            get(handlers::get_interview_status),
        )
        .route(
            "/interviews/:room_name/transcript",
            get(handlers::get_interview_transcript),
        )
        // Recordings
        .route("/recordings", get(handlers::list_recordings))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
