// Duration monitor timing, with tokio's clock paused

mod common;

use common::{FakeEngine, ROOM};
use interview_agent::room::{InterviewJob, JobContext};
use interview_agent::session::{DurationMonitor, EndReason, MonitorExit, MonitorState, Session};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn session(budget_secs: u64) -> Arc<Session> {
    let job = InterviewJob::new(ROOM, None);
    Arc::new(Session::new(
        JobContext::resolve(&job, "software_engineer"),
        Duration::from_secs(budget_secs),
    ))
}

fn monitor(
    session: &Arc<Session>,
    engine: &Arc<FakeEngine>,
    closing: Option<&str>,
) -> Arc<DurationMonitor> {
    Arc::new(DurationMonitor::new(
        session.clone(),
        engine.clone(),
        Duration::from_secs(5),
        Duration::from_secs(3),
        closing.map(str::to_string),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_expiry_detected_within_one_interval() {
    let session = session(60);
    let (engine, _tx) = FakeEngine::new();
    let monitor = monitor(&session, &engine, None);

    session.mark_started();
    let started = Instant::now();
    let exit = monitor.run().await;

    assert_eq!(exit, MonitorExit::Expired);
    assert_eq!(session.end_reason(), Some(EndReason::Timeout));
    assert!(session.is_terminating());
    assert_eq!(monitor.state(), MonitorState::Stopped);

    let took = started.elapsed();
    assert!(took >= Duration::from_secs(60));
    assert!(took < Duration::from_secs(65));
}

#[tokio::test(start_paused = true)]
async fn test_closing_message_then_grace_period() {
    let session = session(20);
    let (engine, _tx) = FakeEngine::new();
    let monitor = monitor(&session, &engine, Some("Thanks, that's all the time we have."));

    session.mark_started();
    let started = Instant::now();
    monitor.run().await;

    assert_eq!(
        engine.messages(),
        vec!["Thanks, that's all the time we have.".to_string()]
    );
    assert_eq!(engine.replies.load(Ordering::SeqCst), 1);
    // 20s budget plus the 3s grace period before termination
    let took = started.elapsed();
    assert!(took >= Duration::from_secs(23));
    assert!(took < Duration::from_secs(24));
}

#[tokio::test(start_paused = true)]
async fn test_waits_until_engine_started() {
    let session = session(10);
    let (engine, _tx) = FakeEngine::new();
    let monitor = monitor(&session, &engine, None);

    let run = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.run().await }
    });

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(monitor.state(), MonitorState::Waiting);
    assert!(!session.is_terminating());

    // Running as soon as the engine is live, not one poll interval later
    session.mark_started();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(monitor.state(), MonitorState::Running);

    let started = Instant::now();
    assert_eq!(run.await.unwrap(), MonitorExit::Expired);
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_other_trigger_stops_monitor() {
    let session = session(1800);
    let (engine, _tx) = FakeEngine::new();
    let monitor = monitor(&session, &engine, Some("Goodbye"));
    session.mark_started();

    let run = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.run().await }
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    session.terminate(EndReason::UserEndedCall);

    assert_eq!(run.await.unwrap(), MonitorExit::Terminated);
    assert_eq!(session.end_reason(), Some(EndReason::UserEndedCall));
    assert!(engine.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_grace_period_keeps_first_reason() {
    let session = session(10);
    let (engine, _tx) = FakeEngine::new();
    let monitor = monitor(&session, &engine, Some("Goodbye"));
    session.mark_started();

    let run = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.run().await }
    });

    // Expiry at 10s, grace period until 13s
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(monitor.state(), MonitorState::Expired);
    assert!(session.terminate(EndReason::PeerDisconnected));

    assert_eq!(run.await.unwrap(), MonitorExit::Terminated);
    assert_eq!(session.end_reason(), Some(EndReason::PeerDisconnected));
    assert_eq!(engine.messages(), vec!["Goodbye".to_string()]);
}
