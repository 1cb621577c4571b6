use super::state::AppState;
use crate::evaluation::evaluate_and_save;
use crate::room::InterviewJob;
use crate::session::{EndReason, InterviewController};
use crate::recording::RecordingInfo;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    pub room_name: String,

    /// Raw job metadata JSON (`candidate_id`, `job_role`)
    pub metadata: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartInterviewResponse {
    pub session_id: String,
    pub room_name: String,
    pub candidate_id: String,
    pub job_role: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndInterviewResponse {
    pub room_name: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingsQuery {
    pub room: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordingsResponse {
    pub room: Option<String>,
    pub recordings: Vec<RecordingInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(room_name: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("No interview running in room {}", room_name),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interviews/start
/// Dispatch an interview into a room and run it in the background
pub async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> impl IntoResponse {
    let room_name = req.room_name.trim().to_string();
    if room_name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "room_name is required".to_string(),
            }),
        )
            .into_response();
    }

    info!("Starting interview in room: {}", room_name);

    if !state.reserve(&room_name).await {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Room {} already has an interview running", room_name),
            }),
        )
            .into_response();
    }

    // Built outside the registry lock; the reservation keeps the room ours
    let job = InterviewJob::new(room_name.clone(), req.metadata);
    let controller =
        match InterviewController::new(state.config.clone(), job, state.backends.as_ref()).await {
            Ok(c) => Arc::new(c),
            Err(e) => {
                state.release(&room_name).await;
                error!("Failed to prepare interview: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to prepare interview: {:#}", e),
                    }),
                )
                    .into_response();
            }
        };

    state.register(&room_name, controller.clone()).await;

    let session = controller.session();
    let response = StartInterviewResponse {
        session_id: session.id().to_string(),
        room_name: room_name.clone(),
        candidate_id: session.candidate_id().to_string(),
        job_role: session.job_role().to_string(),
        status: "starting".to_string(),
    };

    tokio::spawn(run_interview(state, room_name, controller));

    (StatusCode::ACCEPTED, Json(response)).into_response()
}

async fn run_interview(state: AppState, room_name: String, controller: Arc<InterviewController>) {
    let outcome = controller.start_interview().await;

    state.sessions.write().await.remove(&room_name);

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Interview in room {} failed: {:#}", room_name, e);
            return;
        }
    };

    info!(
        "Interview {} finished ({})",
        outcome.session_id,
        outcome.cleanup.reason.as_str()
    );

    if !state.config.evaluation.auto_evaluate {
        return;
    }
    let Some(evaluator) = state.evaluator.clone() else {
        warn!("auto_evaluate is set but no evaluator is configured");
        return;
    };

    let transcript = controller.transcript();
    if transcript.is_empty().await {
        info!("Empty transcript, skipping evaluation");
        return;
    }

    let text = transcript.format().await;
    match evaluate_and_save(
        evaluator.as_ref(),
        &state.config.evaluation,
        &text,
        &outcome.job_role,
        &outcome.candidate_id,
    )
    .await
    {
        Ok(files) => info!(
            "Candidate {} scored {}/10 ({})",
            outcome.candidate_id, files.evaluation.overall_score, files.evaluation.recommendation
        ),
        Err(e) => error!("Evaluation failed for {}: {:#}", outcome.candidate_id, e),
    }
}

/// POST /interviews/:room_name/end
/// Ask a running interview to end; cleanup runs on the interview task
pub async fn end_interview(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> impl IntoResponse {
    info!("End requested for room: {}", room_name);

    let Some(controller) = state.get(&room_name).await else {
        return not_found(&room_name);
    };

    let message = if controller.request_end(EndReason::Stopped) {
        "Interview ending".to_string()
    } else {
        "Interview already ending".to_string()
    };

    (
        StatusCode::ACCEPTED,
        Json(EndInterviewResponse {
            room_name,
            status: "ending".to_string(),
            message,
        }),
    )
        .into_response()
}

/// GET /interviews/:room_name/status
pub async fn get_interview_status(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> impl IntoResponse {
    match state.get(&room_name).await {
        Some(controller) => (StatusCode::OK, Json(controller.status().await)).into_response(),
        None => not_found(&room_name),
    }
}

/// GET /interviews/:room_name/transcript
/// Transcript accumulated so far, with statistics
pub async fn get_interview_transcript(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> impl IntoResponse {
    match state.get(&room_name).await {
        Some(controller) => {
            let export = controller.transcript().export().await;
            (StatusCode::OK, Json(export)).into_response()
        }
        None => not_found(&room_name),
    }
}

/// GET /recordings?room=<name>
/// Recording jobs known to the egress service, optionally for one room
pub async fn list_recordings(
    State(state): State<AppState>,
    Query(query): Query<RecordingsQuery>,
) -> impl IntoResponse {
    let Some(recordings) = state.recordings.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Recording listing is not configured".to_string(),
            }),
        )
            .into_response();
    };

    let room = query.room.filter(|r| !r.trim().is_empty());
    match recordings.list_recordings(room.as_deref()).await {
        Ok(recordings) => {
            (StatusCode::OK, Json(RecordingsResponse { room, recordings })).into_response()
        }
        Err(e) => {
            error!("Failed to list recordings: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Failed to list recordings: {:#}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
