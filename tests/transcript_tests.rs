// Integration tests for transcript aggregation

use interview_agent::transcript::{
    candidate_responses, interviewer_questions, Speaker, TranscriptAggregator,
};

#[tokio::test]
async fn test_interim_results_never_stored() {
    let agg = TranscriptAggregator::new("cand-1_20250101_120000");

    agg.record(Speaker::Interviewer, "Tell me", false).await;
    agg.record(Speaker::Interviewer, "Tell me about a project.", true).await;
    agg.record(Speaker::Candidate, "Sure", false).await;
    agg.record(Speaker::Candidate, "Sure, last year I built a scheduler.", true)
        .await;
    agg.record(Speaker::Interviewer, "What was hard?", true).await;

    let entries = agg.snapshot().await;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].speaker, Speaker::Interviewer);
    assert_eq!(entries[1].speaker, Speaker::Candidate);
    assert_eq!(entries[1].text, "Sure, last year I built a scheduler.");
    assert_eq!(entries[2].text, "What was hard?");
}

#[tokio::test]
async fn test_consecutive_finals_from_same_speaker_coalesce() {
    let agg = TranscriptAggregator::new("test");

    agg.record(Speaker::Candidate, "I started in QA.", true).await;
    agg.record(Speaker::Candidate, "Then moved to backend.", true).await;
    agg.record(Speaker::Candidate, "Now I lead a team.", true).await;

    let entries = agg.snapshot().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].text,
        "I started in QA. Then moved to backend. Now I lead a team."
    );
}

#[tokio::test]
async fn test_blank_text_ignored() {
    let agg = TranscriptAggregator::new("test");

    agg.record(Speaker::Candidate, "", true).await;
    agg.record(Speaker::Candidate, "   \n", true).await;

    assert!(agg.is_empty().await);
    assert_eq!(agg.format().await, "");
}

#[tokio::test]
async fn test_adjacent_entries_differ_in_speaker() {
    let agg = TranscriptAggregator::new("test");
    let script = [
        (Speaker::Interviewer, "Hi!"),
        (Speaker::Interviewer, "How are you?"),
        (Speaker::Candidate, "Good."),
        (Speaker::Unknown, "(noise)"),
        (Speaker::Candidate, "Sorry, go on."),
        (Speaker::Candidate, "I'm ready."),
    ];
    for (speaker, text) in script {
        agg.record(speaker, text, true).await;
    }

    let entries = agg.snapshot().await;
    assert_eq!(entries.len(), 4);
    for pair in entries.windows(2) {
        assert_ne!(pair[0].speaker, pair[1].speaker);
    }
}

#[tokio::test]
async fn test_format_layout() {
    let agg = TranscriptAggregator::new("test");
    agg.record(Speaker::Interviewer, "Welcome.", true).await;
    agg.record(Speaker::Candidate, "Thanks.", true).await;
    agg.record(Speaker::Unknown, "Hello?", true).await;

    assert_eq!(
        agg.format().await,
        "[Interviewer]: Welcome.\n\n[Candidate]: Thanks.\n\n[Unknown]: Hello?"
    );
}

#[tokio::test]
async fn test_stats_and_export() {
    let agg = TranscriptAggregator::new("cand-9_20250101_120000");
    agg.record(Speaker::Interviewer, "Why Rust?", true).await;
    agg.record(Speaker::Candidate, "Memory safety without a garbage collector.", true)
        .await;
    agg.record(Speaker::Interviewer, "Great. Next topic.", true).await;

    let stats = agg.stats().await;
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.words_for(Speaker::Interviewer), 5);
    assert_eq!(stats.words_for(Speaker::Candidate), 6);
    assert_eq!(stats.questions_asked, 1);

    let ratio = stats.talk_time_ratio();
    assert_eq!(ratio.interviewer_words + ratio.candidate_words, 11);
    assert!((ratio.interviewer_ratio + ratio.candidate_ratio - 1.0).abs() < 1e-9);

    let entries = agg.snapshot().await;
    assert_eq!(interviewer_questions(&entries), vec!["Why Rust?"]);
    assert_eq!(
        candidate_responses(&entries),
        vec!["Memory safety without a garbage collector."]
    );

    let export = agg.export().await;
    assert_eq!(export.interview_id, "cand-9_20250101_120000");
    assert_eq!(export.transcript.len(), 3);

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["transcript"][0]["speaker"], "interviewer");
    assert_eq!(json["statistics"]["total_entries"], 3);
    assert_eq!(json["statistics"]["candidate_responses"], 1);
    assert_eq!(json["statistics"]["talk_time"]["candidate_words"], 6);
    assert_eq!(json["statistics"]["talk_time"]["interviewer_words"], 5);
}

#[tokio::test]
async fn test_three_finals_with_interims_format_three_blocks() {
    let agg = TranscriptAggregator::new("test");
    agg.record(Speaker::Candidate, "Hello there.", true).await;
    agg.record(Speaker::Interviewer, "Hi", false).await;
    agg.record(Speaker::Interviewer, "Hi, welcome in.", true).await;
    agg.record(Speaker::Candidate, "Thank y", false).await;
    agg.record(Speaker::Candidate, "Thank you, glad to be here.", true).await;

    let formatted = agg.format().await;
    let blocks: Vec<&str> = formatted.split("\n\n").collect();
    assert_eq!(blocks.len(), 3);
    assert!(!formatted.contains("Thank y\n"));
    assert!(!blocks.contains(&"[Interviewer]: Hi"));
    assert_eq!(blocks[2], "[Candidate]: Thank you, glad to be here.");
}
