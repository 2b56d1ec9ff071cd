//! Pipeline Scenario Integration Tests
//!
//! Recorded pipeline runs replayed through the full monitor runtime under
//! paused time.

use std::time::Duration;

use case_review_core::{Decision, DecisionState, RiskLevel, Stage, StageStatus};
use case_review_monitor::services::presentation::{OutcomeView, UnresolvedReason};
use case_review_monitor::services::transport::ReplayPace;
use case_review_pacing::CloseReason;

use crate::support::{monitor, run, Recording};

const MESSAGE_DELAY: Duration = Duration::from_millis(500);

fn status(view: &case_review_monitor::MonitorView, stage: Stage) -> StageStatus {
    view.stage(stage).map(|s| s.status).unwrap()
}

// ============================================================================
// Outcome Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_approve_scenario() {
    let recording = Recording::new("case-approve")
        .started()
        .clean_checks()
        .decision("APPROVE", "LOW", 0.92)
        .complete(Some("APPROVE"), "low", 0.92);

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-approve",
    )
    .await;

    assert_eq!(view.closed, Some(CloseReason::Completed));
    for stage in Stage::ALL {
        assert_eq!(status(&view, stage), StageStatus::Success, "{}", stage);
    }
    match view.outcome {
        OutcomeView::Banner {
            decision,
            risk_level,
            confidence_percent,
            ..
        } => {
            assert_eq!(decision, Decision::Approve);
            assert_eq!(risk_level, Some(RiskLevel::Low));
            assert_eq!(confidence_percent, Some(92));
        }
        other => panic!("expected approve banner, got {:?}", other),
    }
    assert!(view.is_complete);
    assert!(!view.narrative_visible);
    assert_eq!(view.current_thought.as_deref(), Some("Decision: APPROVE"));
}

#[tokio::test(start_paused = true)]
async fn test_escalate_routes_to_human_review() {
    let recording = Recording::new("case-escalate")
        .started()
        .clean_checks()
        .decision("ESCALATE", "HIGH", 0.55)
        .complete(Some("ESCALATE"), "high", 0.55);

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-escalate",
    )
    .await;

    assert_eq!(
        status(&view, Stage::ComplianceDecision),
        StageStatus::Escalated
    );
    match view.outcome {
        OutcomeView::HumanReview { risk_level, .. } => {
            assert_eq!(risk_level, Some(RiskLevel::High));
        }
        other => panic!("expected human review, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_workflow_complete_is_decision_fallback() {
    let recording = Recording::new("case-fallback")
        .started()
        .clean_checks()
        .complete(Some("REJECT"), "high", 0.8);

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-fallback",
    )
    .await;

    // The officer never reported a decision, so its stage stays open while
    // the fallback still resolves the outcome.
    assert_eq!(status(&view, Stage::ComplianceDecision), StageStatus::Active);
    assert_eq!(view.closed, Some(CloseReason::Completed));
    assert!(matches!(
        view.outcome,
        OutcomeView::Banner {
            decision: Decision::Reject,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_decision_never_overwrites() {
    let recording = Recording::new("case-repeat")
        .started()
        .clean_checks()
        .decision("APPROVE", "LOW", 0.9)
        .decision("REJECT", "HIGH", 0.99)
        .complete(Some("REJECT"), "high", 0.99);

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-repeat",
    )
    .await;

    let decision = view.final_decision.unwrap();
    assert_eq!(decision.decision, Decision::Approve);
    assert_eq!(decision.risk_level, Some(RiskLevel::Low));
}

#[tokio::test(start_paused = true)]
async fn test_late_officer_decision_replaces_workflow_fallback() {
    let recording = Recording::new("case-late-officer")
        .started()
        .clean_checks()
        .complete(Some("REJECT"), "high", 0.8)
        .decision("APPROVE", "LOW", 0.9);

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-late-officer",
    )
    .await;

    assert_eq!(view.closed, Some(CloseReason::Completed));
    assert_eq!(status(&view, Stage::ComplianceDecision), StageStatus::Success);
    match view.outcome {
        OutcomeView::Banner { decision, risk_level, .. } => {
            assert_eq!(decision, Decision::Approve);
            assert_eq!(risk_level, Some(RiskLevel::Low));
        }
        other => panic!("expected approve banner, got {:?}", other),
    }
}

// ============================================================================
// Failure Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_error_is_sticky_and_outcome_unresolved() {
    let recording = Recording::new("case-error")
        .started()
        .activity("document_inspector", "Extraction Failed", "error", "OCR backend unavailable")
        .activity("document_inspector", "Extraction Complete", "success", "Recovered")
        .error("OCR backend unavailable");

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-error",
    )
    .await;

    assert_eq!(status(&view, Stage::DocumentInspection), StageStatus::Error);
    assert_eq!(view.decision_state, DecisionState::Unknown);
    assert_eq!(
        view.outcome,
        OutcomeView::Unresolved {
            reason: UnresolvedReason::NoDecisionPayload
        }
    );
    assert_eq!(view.closed, Some(CloseReason::Completed));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_pipeline_times_out_unresolved() {
    let recording = Recording::new("case-stall");

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-stall",
    )
    .await;

    assert_eq!(view.closed, Some(CloseReason::TimedOut));
    assert_eq!(view.elapsed_seconds, 30);
    assert_eq!(view.decision_state, DecisionState::Pending);
    assert!(view.final_decision.is_none());
    assert_eq!(
        view.outcome,
        OutcomeView::Unresolved {
            reason: UnresolvedReason::TimedOut
        }
    );
}

// ============================================================================
// Ordering Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_bridging_activates_next_stage() {
    let recording = Recording::new("case-bridge")
        .started()
        .activity("document_inspector", "Extraction Complete", "success", "All fields extracted");

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-bridge",
    )
    .await;

    assert_eq!(status(&view, Stage::DocumentInspection), StageStatus::Success);
    assert_eq!(status(&view, Stage::ExternalVerification), StageStatus::Active);
    assert_eq!(status(&view, Stage::ComplianceDecision), StageStatus::Pending);
    assert!(!view.stage(Stage::ExternalVerification).unwrap().inferred);
    assert_eq!(view.closed, Some(CloseReason::TimedOut));
}

#[tokio::test(start_paused = true)]
async fn test_later_stage_backfills_earlier_one() {
    let recording = Recording::new("case-backfill")
        .started()
        .activity("external_verifier", "Verification Complete", "success", "DVS matched");

    let view = run(
        monitor(recording.transport(), ReplayPace::Immediate, MESSAGE_DELAY),
        "case-backfill",
    )
    .await;

    let inspection = view.stage(Stage::DocumentInspection).unwrap();
    assert_eq!(inspection.status, StageStatus::Success);
    assert!(inspection.inferred);
    assert_eq!(status(&view, Stage::ExternalVerification), StageStatus::Success);
    assert_eq!(status(&view, Stage::ComplianceDecision), StageStatus::Active);
}
