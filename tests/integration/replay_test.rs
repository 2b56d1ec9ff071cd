//! Replay Integration Tests
//!
//! Pacing and delivery speed change only when things are shown, never what
//! the monitor concludes.

use std::sync::Arc;
use std::time::Duration;

use case_review_monitor::models::settings::MonitorConfig;
use case_review_monitor::services::monitor::CaseMonitor;
use case_review_monitor::services::transport::{FrameRecorder, ReplayPace, ReplayTransport};
use case_review_monitor::MonitorView;
use case_review_pacing::{CloseReason, DelayGenerator, FixedDelay, PacingConfig};

use crate::support::{monitor, run, Recording};

fn recording() -> Recording {
    Recording::new("case-replay")
        .started()
        .activity("document_inspector", "Document Inspection Started", "started", "Loading documents")
        .activity("document_inspector", "Quality Check", "warning", "Glare on page 2")
        .activity("document_inspector", "Extraction Complete", "warning", "Extracted with warnings")
        .activity("external_verifier", "Verification Started", "started", "Contacting DVS")
        .activity("external_verifier", "Verification Complete", "success", "DVS matched")
        .decision("APPROVE", "MEDIUM", 0.74)
        .complete(Some("APPROVE"), "medium", 0.74)
}

/// Zero pacing waits and back-to-back delivery.
fn instant_monitor(transport: ReplayTransport) -> CaseMonitor {
    let mut config = MonitorConfig::default();
    config.history_backfill = false;
    config.pacing = config.pacing.without_delays();
    CaseMonitor::new(config, Arc::new(transport)).with_delays(
        |_: &PacingConfig| -> Box<dyn DelayGenerator> { Box::new(FixedDelay::base()) },
    )
}

fn assert_same_outcome(fast: &MonitorView, slow: &MonitorView) {
    assert_eq!(fast.stages, slow.stages);
    assert_eq!(fast.decision_state, slow.decision_state);
    assert_eq!(fast.final_decision, slow.final_decision);
    assert_eq!(fast.outcome, slow.outcome);
    assert_eq!(fast.current_thought, slow.current_thought);
    assert_eq!(fast.event_count, slow.event_count);
}

#[tokio::test(start_paused = true)]
async fn test_replay_outcome_independent_of_delays() {
    let fast = run(instant_monitor(recording().transport()), "case-replay").await;
    let slow = run(
        monitor(
            recording().transport(),
            ReplayPace::Fixed(Duration::from_millis(700)),
            Duration::from_millis(900),
        ),
        "case-replay",
    )
    .await;

    assert_eq!(fast.closed, Some(CloseReason::Completed));
    assert_eq!(slow.closed, Some(CloseReason::Completed));
    assert_same_outcome(&fast, &slow);
    assert!(slow.elapsed_seconds > fast.elapsed_seconds);
}

#[tokio::test(start_paused = true)]
async fn test_recorded_session_replays_to_same_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("case-replay.jsonl");

    let mut recorder = FrameRecorder::create(&path).await.unwrap();
    for line in recording().text().lines() {
        recorder.record(line).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    drop(recorder);

    let original = run(instant_monitor(recording().transport()), "case-replay").await;
    let replayed = ReplayTransport::from_file(&path).unwrap();
    assert_eq!(replayed.first_case_id().as_deref(), Some("case-replay"));

    let view = run(
        monitor(replayed, ReplayPace::Recorded, Duration::from_millis(500)),
        "case-replay",
    )
    .await;
    assert_same_outcome(&original, &view);
}
