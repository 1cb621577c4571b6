// HTTP control API tests, driven through the router without a listener

mod common;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{recording_info, test_config, Harness, StartBehavior, ROOM};
use interview_agent::{create_router, AppState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let harness = Harness::new(StartBehavior::Succeed);
    let state = AppState::new(Arc::new(test_config()), Arc::new(harness.backends));
    let app = create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_unknown_room_is_not_found() {
    let harness = Harness::new(StartBehavior::Succeed);
    let state = AppState::new(Arc::new(test_config()), Arc::new(harness.backends));
    let app = create_router(state);

    let (status, body) = send(&app, "GET", "/interviews/nope/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = send(&app, "POST", "/interviews/nope/end", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_status_end_lifecycle() -> Result<()> {
    let harness = Harness::new(StartBehavior::Succeed);
    let backends = Arc::new(harness.backends);
    let state = AppState::new(Arc::new(test_config()), backends.clone());
    let app = create_router(state.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/interviews/start",
        Some(serde_json::json!({
            "room_name": ROOM,
            "metadata": r#"{"candidate_id":"cand-3","job_role":"devops_engineer"}"#,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["candidate_id"], "cand-3");
    assert_eq!(body["job_role"], "devops_engineer");
    assert!(body["session_id"].as_str().unwrap().starts_with("interview-"));

    // Same room twice is refused while the first interview runs
    let (status, _) = send(
        &app,
        "POST",
        "/interviews/start",
        Some(serde_json::json!({ "room_name": ROOM })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "GET", &format!("/interviews/{}/status", ROOM), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_name"], ROOM);
    assert_eq!(body["budget_secs"], 1800);

    let (status, body) =
        send(&app, "GET", &format!("/interviews/{}/transcript", ROOM), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["transcript"].is_array());

    let (status, body) = send(&app, "POST", &format!("/interviews/{}/end", ROOM), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "ending");

    // Finished sessions leave the registry
    for _ in 0..200 {
        if state.sessions.read().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.sessions.read().await.is_empty());
    assert_eq!(backends.room.disconnects.load(Ordering::SeqCst), 1);

    let (status, _) = send(&app, "GET", &format!("/interviews/{}/status", ROOM), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_start_requires_room_name() {
    let harness = Harness::new(StartBehavior::Succeed);
    let state = AppState::new(Arc::new(test_config()), Arc::new(harness.backends));
    let app = create_router(state);

    let (status, _) = send(
        &app,
        "POST",
        "/interviews/start",
        Some(serde_json::json!({ "room_name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slow_start_does_not_block_other_requests() -> Result<()> {
    let harness = Harness::new(StartBehavior::Succeed);
    let gate = Arc::new(Notify::new());
    *harness.backends.engine_gate.lock().unwrap() = Some(gate.clone());
    let backends = Arc::new(harness.backends);
    let state = AppState::new(Arc::new(test_config()), backends.clone());
    let app = create_router(state.clone());

    // First start parks while its collaborators are being built
    let first = tokio::spawn({
        let app = app.clone();
        async move {
            send(
                &app,
                "POST",
                "/interviews/start",
                Some(serde_json::json!({ "room_name": ROOM })),
            )
            .await
        }
    });
    for _ in 0..200 {
        if state.starting.lock().await.contains(ROOM) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(state.starting.lock().await.contains(ROOM));

    // Queries for other rooms answer while the start is in flight
    let (status, _) = tokio::time::timeout(
        Duration::from_secs(1),
        send(&app, "GET", "/interviews/other/status", None),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The room is already claimed
    let (status, _) = tokio::time::timeout(
        Duration::from_secs(1),
        send(
            &app,
            "POST",
            "/interviews/start",
            Some(serde_json::json!({ "room_name": ROOM })),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    gate.notify_one();
    let (status, _) = first.await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(state.starting.lock().await.is_empty());
    assert!(state.get(ROOM).await.is_some());

    let (status, _) = send(&app, "POST", &format!("/interviews/{}/end", ROOM), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    Ok(())
}

#[tokio::test]
async fn test_list_recordings_by_room() {
    let harness = Harness::new(StartBehavior::Succeed);
    let recorder = harness.backends.recorder.clone();
    recorder.listed.lock().unwrap().extend([
        recording_info("EG_1", ROOM, Some("https://cdn.example/EG_1.mp4")),
        recording_info("EG_2", "room-2", None),
    ]);
    let state = AppState::new(Arc::new(test_config()), Arc::new(harness.backends))
        .with_recordings(recorder.clone());
    let app = create_router(state);

    let (status, body) = send(&app, "GET", &format!("/recordings?room={}", ROOM), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"], ROOM);
    let recordings = body["recordings"].as_array().unwrap();
    assert_eq!(recordings.len(), 1);
    assert_eq!(recordings[0]["handle"], "EG_1");
    assert_eq!(recordings[0]["status"], "complete");
    assert_eq!(
        recordings[0]["artifacts"][0]["download_url"],
        "https://cdn.example/EG_1.mp4"
    );

    let (status, body) = send(&app, "GET", "/recordings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["room"].is_null());
    assert_eq!(body["recordings"].as_array().unwrap().len(), 2);

    assert_eq!(
        recorder.list_queries.lock().unwrap().clone(),
        vec![Some(ROOM.to_string()), None]
    );
}

#[tokio::test]
async fn test_recordings_unavailable_without_backend() {
    let harness = Harness::new(StartBehavior::Succeed);
    let state = AppState::new(Arc::new(test_config()), Arc::new(harness.backends));
    let app = create_router(state);

    let (status, _) = send(&app, "GET", "/recordings", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
