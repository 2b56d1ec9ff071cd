//! Presentation Projection
//!
//! Pure mapping from engine output and pacing state to what a reviewer sees:
//! labels, colors, the gated stage list and the outcome panel. Nothing here
//! mutates state.

use std::fmt::Write as _;
use std::time::Instant;

use case_review_core::{
    Decision, DecisionState, FinalDecision, RiskLevel, Stage, StageState, StageStatus,
};
use case_review_pacing::{CloseReason, Narration, PacingPhase, PacingScheduler};
use case_review_reconcile::ProgressSnapshot;
use serde::{Deserialize, Serialize};

use super::transport::ConnectionSignal;

/// Palette shared by stage, decision and risk badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Gray,
    Blue,
    Green,
    Amber,
    Red,
    Purple,
}

impl StatusColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Gray => "gray",
            StatusColor::Blue => "blue",
            StatusColor::Green => "green",
            StatusColor::Amber => "amber",
            StatusColor::Red => "red",
            StatusColor::Purple => "purple",
        }
    }
}

pub fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "Pending",
        StageStatus::Active => "In Progress",
        StageStatus::Success => "Complete",
        StageStatus::Warning => "Complete with Warnings",
        StageStatus::Error => "Failed",
        StageStatus::Escalated => "Escalated",
    }
}

pub fn status_color(status: StageStatus) -> StatusColor {
    match status {
        StageStatus::Pending => StatusColor::Gray,
        StageStatus::Active => StatusColor::Blue,
        StageStatus::Success => StatusColor::Green,
        StageStatus::Warning => StatusColor::Amber,
        StageStatus::Error => StatusColor::Red,
        StageStatus::Escalated => StatusColor::Purple,
    }
}

pub fn decision_headline(decision: Decision) -> &'static str {
    match decision {
        Decision::Approve => "AI Approved",
        Decision::Reject => "AI Rejected",
        Decision::Escalate => "Escalated for Human Review",
    }
}

pub fn decision_color(decision: Decision) -> StatusColor {
    match decision {
        Decision::Approve => StatusColor::Green,
        Decision::Reject => StatusColor::Red,
        Decision::Escalate => StatusColor::Purple,
    }
}

pub fn risk_label(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "Low Risk",
        RiskLevel::Medium => "Medium Risk",
        RiskLevel::High => "High Risk",
    }
}

pub fn risk_color(risk: RiskLevel) -> StatusColor {
    match risk {
        RiskLevel::Low => StatusColor::Green,
        RiskLevel::Medium => StatusColor::Amber,
        RiskLevel::High => StatusColor::Red,
    }
}

/// Stream liveness as shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Stale,
}

impl ConnectionState {
    pub fn apply(self, signal: ConnectionSignal) -> Self {
        match signal {
            ConnectionSignal::Connected | ConnectionSignal::Heartbeat => ConnectionState::Connected,
            ConnectionSignal::Disconnected => ConnectionState::Disconnected,
            ConnectionSignal::Stale => ConnectionState::Stale,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "live",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Stale => "stale",
        }
    }
}

/// One row of the stage list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageView {
    pub stage: Stage,
    pub name: String,
    pub status: StageStatus,
    pub label: String,
    pub color: StatusColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub inferred: bool,
}

impl From<&StageState> for StageView {
    fn from(state: &StageState) -> Self {
        Self {
            stage: state.stage,
            name: state.stage.display_name().to_string(),
            status: state.status,
            label: status_label(state.status).to_string(),
            color: status_color(state.status),
            message: state.details.clone(),
            confidence_percent: state.confidence.map(case_review_core::confidence_percent),
            duration_ms: state.duration_ms,
            inferred: state.inferred,
        }
    }
}

/// Why no outcome can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The pipeline finished without an extractable decision.
    NoDecisionPayload,
    /// The hard fallback fired before any terminal signal.
    TimedOut,
}

/// Outcome panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeView {
    /// Nothing to reveal yet.
    InProgress,
    /// Approve or reject banner.
    Banner {
        decision: Decision,
        headline: String,
        color: StatusColor,
        #[serde(skip_serializing_if = "Option::is_none")]
        risk_level: Option<RiskLevel>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence_percent: Option<u8>,
    },
    /// Escalated cases route here, never to a banner.
    HumanReview {
        headline: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        risk_level: Option<RiskLevel>,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence_percent: Option<u8>,
    },
    Unresolved { reason: UnresolvedReason },
}

impl OutcomeView {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, OutcomeView::Unresolved { .. })
    }
}

fn human_review(decision: Option<&FinalDecision>) -> OutcomeView {
    OutcomeView::HumanReview {
        headline: decision_headline(Decision::Escalate).to_string(),
        risk_level: decision.and_then(|d| d.risk_level),
        confidence_percent: decision.and_then(FinalDecision::confidence_percent),
    }
}

/// Route the engine outcome to a panel.
///
/// The outcome stays hidden while the narrative is still walking the
/// stages; it is revealed once the scheduler lingers or closes.
pub fn route_outcome(progress: &ProgressSnapshot, phase: PacingPhase) -> OutcomeView {
    let revealed = matches!(phase, PacingPhase::Lingering | PacingPhase::Closed(_));
    if !revealed {
        return OutcomeView::InProgress;
    }

    let escalated_stage =
        progress.derivation.status(Stage::ComplianceDecision) == StageStatus::Escalated;

    match &progress.decision {
        DecisionState::Resolved { decision } => {
            if decision.decision.requires_human_review() || escalated_stage {
                human_review(Some(decision))
            } else {
                OutcomeView::Banner {
                    decision: decision.decision,
                    headline: decision_headline(decision.decision).to_string(),
                    color: decision_color(decision.decision),
                    risk_level: decision.risk_level,
                    confidence_percent: decision.confidence_percent(),
                }
            }
        }
        _ if escalated_stage => human_review(None),
        DecisionState::Unknown => OutcomeView::Unresolved {
            reason: UnresolvedReason::NoDecisionPayload,
        },
        DecisionState::Pending => match phase {
            PacingPhase::Closed(CloseReason::TimedOut) => OutcomeView::Unresolved {
                reason: UnresolvedReason::TimedOut,
            },
            _ => OutcomeView::InProgress,
        },
    }
}

/// Everything the host renders for the observed case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorView {
    pub session_id: String,
    pub case_id: String,
    pub stages: Vec<StageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_thought: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<Narration>,
    pub elapsed_seconds: u64,
    pub decision_state: DecisionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<FinalDecision>,
    pub is_complete: bool,
    pub outcome: OutcomeView,
    pub connection: ConnectionState,
    pub narrative_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<CloseReason>,
    pub event_count: usize,
}

impl MonitorView {
    pub fn stage(&self, stage: Stage) -> Option<&StageView> {
        self.stages.iter().find(|view| view.stage == stage)
    }
}

/// Project the session's current state.
///
/// Stages are gated by the scheduler. While a stage is being narrated the
/// current thought is the scripted message, so real details from later
/// stages cannot leak ahead of the narrative.
pub fn project(
    session_id: &str,
    case_id: &str,
    progress: &ProgressSnapshot,
    pacing: &PacingScheduler,
    connection: ConnectionState,
    now: Instant,
) -> MonitorView {
    let phase = pacing.phase();
    let stages = pacing
        .gate(&progress.derivation)
        .iter()
        .map(StageView::from)
        .collect();

    let current_thought = match phase {
        PacingPhase::LeadIn
        | PacingPhase::Waiting { .. }
        | PacingPhase::AwaitingCompletion { .. } => pacing.narration().map(|n| n.message.clone()),
        _ => progress.derivation.current_thought.clone(),
    };

    let closed = match phase {
        PacingPhase::Closed(reason) => Some(reason),
        _ => None,
    };

    MonitorView {
        session_id: session_id.to_string(),
        case_id: case_id.to_string(),
        stages,
        current_thought,
        narration: pacing.narration().cloned(),
        elapsed_seconds: pacing.state(now).elapsed.as_secs(),
        decision_state: progress.decision,
        final_decision: progress.final_decision().copied(),
        is_complete: progress.is_complete(),
        outcome: route_outcome(progress, phase),
        connection,
        narrative_visible: pacing.is_visible(),
        closed,
        event_count: progress.event_count,
    }
}

fn stage_marker(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "[ ]",
        StageStatus::Active => "[>]",
        StageStatus::Success => "[x]",
        StageStatus::Warning => "[!]",
        StageStatus::Error => "[E]",
        StageStatus::Escalated => "[^]",
    }
}

/// Plain-text rendering for terminals.
pub fn render_text(view: &MonitorView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Case {}  [{}]  {}s",
        view.case_id,
        view.connection.label(),
        view.elapsed_seconds
    );

    for stage in &view.stages {
        let _ = write!(out, "  {} {:<24} {}", stage_marker(stage.status), stage.name, stage.label);
        if let Some(percent) = stage.confidence_percent {
            let _ = write!(out, " ({}%)", percent);
        }
        if stage.inferred {
            out.push_str(" *");
        }
        if let Some(message) = stage.message.as_deref().filter(|m| !m.is_empty()) {
            let _ = write!(out, "\n      {}", message);
        }
        out.push('\n');
    }

    if let Some(thought) = &view.current_thought {
        let _ = writeln!(out, "  > {}", thought);
    }

    let outcome = match &view.outcome {
        OutcomeView::InProgress => "in progress".to_string(),
        OutcomeView::Banner {
            headline,
            risk_level,
            confidence_percent,
            ..
        } => {
            let mut line = headline.clone();
            if let Some(risk) = risk_level {
                let _ = write!(line, ", {}", risk_label(*risk));
            }
            if let Some(percent) = confidence_percent {
                let _ = write!(line, ", {}% confidence", percent);
            }
            line
        }
        OutcomeView::HumanReview { headline, risk_level, .. } => match risk_level {
            Some(risk) => format!("{}, {}", headline, risk_label(*risk)),
            None => headline.clone(),
        },
        OutcomeView::Unresolved {
            reason: UnresolvedReason::TimedOut,
        } => "unresolved (no terminal signal before timeout)".to_string(),
        OutcomeView::Unresolved {
            reason: UnresolvedReason::NoDecisionPayload,
        } => "unresolved (pipeline ended without a decision)".to_string(),
    };
    let _ = writeln!(out, "Outcome: {}", outcome);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_review_core::{ActivityEvent, ActivityStatus, Agent, EventData};
    use case_review_reconcile::Reconciler;

    fn progress(events: Vec<ActivityEvent>) -> ProgressSnapshot {
        let mut reconciler = Reconciler::new(100);
        reconciler.attach("c-1");
        for event in events {
            reconciler.ingest(event);
        }
        reconciler.snapshot()
    }

    fn officer_decision(decision: Decision) -> ActivityEvent {
        ActivityEvent::new(
            "c-1",
            Agent::ComplianceOfficer,
            "Decision Made",
            ActivityStatus::Decision,
        )
        .with_data(EventData {
            decision: Some(decision),
            risk_level: Some(RiskLevel::Medium),
            confidence: Some(0.81),
            ..Default::default()
        })
    }

    #[test]
    fn test_status_palette() {
        assert_eq!(status_color(StageStatus::Escalated), StatusColor::Purple);
        assert_eq!(status_color(StageStatus::Warning), StatusColor::Amber);
        assert_eq!(status_label(StageStatus::Active), "In Progress");
        assert_eq!(risk_color(RiskLevel::High), StatusColor::Red);
    }

    #[test]
    fn test_connection_state_transitions() {
        let state = ConnectionState::default();
        assert_eq!(state, ConnectionState::Connecting);
        let state = state.apply(ConnectionSignal::Stale);
        assert_eq!(state, ConnectionState::Stale);
        assert_eq!(state.apply(ConnectionSignal::Heartbeat), ConnectionState::Connected);
        assert_eq!(
            state.apply(ConnectionSignal::Disconnected),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_outcome_hidden_while_narrating() {
        let progress = progress(vec![officer_decision(Decision::Approve)]);
        let phase = PacingPhase::AwaitingCompletion {
            stage: Stage::DocumentInspection,
        };
        assert_eq!(route_outcome(&progress, phase), OutcomeView::InProgress);
    }

    #[test]
    fn test_approve_routes_to_banner() {
        let progress = progress(vec![officer_decision(Decision::Approve)]);
        match route_outcome(&progress, PacingPhase::Lingering) {
            OutcomeView::Banner {
                decision,
                color,
                confidence_percent,
                ..
            } => {
                assert_eq!(decision, Decision::Approve);
                assert_eq!(color, StatusColor::Green);
                assert_eq!(confidence_percent, Some(81));
            }
            other => panic!("expected banner, got {:?}", other),
        }
    }

    #[test]
    fn test_escalate_routes_to_human_review() {
        let progress = progress(vec![officer_decision(Decision::Escalate)]);
        let outcome = route_outcome(&progress, PacingPhase::Closed(CloseReason::Completed));
        assert!(matches!(outcome, OutcomeView::HumanReview { .. }));
    }

    #[test]
    fn test_missing_payload_is_unresolved() {
        let progress = progress(vec![ActivityEvent::new(
            "c-1",
            Agent::System,
            "Workflow Error",
            ActivityStatus::Error,
        )]);
        assert_eq!(
            route_outcome(&progress, PacingPhase::Lingering),
            OutcomeView::Unresolved {
                reason: UnresolvedReason::NoDecisionPayload
            }
        );
    }

    #[test]
    fn test_timeout_without_decision_is_unresolved_not_rejected() {
        let progress = progress(Vec::new());
        assert_eq!(
            route_outcome(&progress, PacingPhase::Closed(CloseReason::TimedOut)),
            OutcomeView::Unresolved {
                reason: UnresolvedReason::TimedOut
            }
        );
    }

    #[test]
    fn test_render_text_lists_every_stage() {
        let view = MonitorView {
            session_id: "s".into(),
            case_id: "c-1".into(),
            stages: progress(Vec::new())
                .derivation
                .stages
                .iter()
                .map(StageView::from)
                .collect(),
            current_thought: Some("Running OCR".into()),
            narration: None,
            elapsed_seconds: 4,
            decision_state: DecisionState::Pending,
            final_decision: None,
            is_complete: false,
            outcome: OutcomeView::InProgress,
            connection: ConnectionState::Connected,
            narrative_visible: false,
            closed: None,
            event_count: 0,
        };
        let text = render_text(&view);
        assert!(text.starts_with("Case c-1  [live]  4s"));
        for stage in Stage::ALL {
            assert!(text.contains(stage.display_name()));
        }
        assert!(text.contains("> Running OCR"));
        assert!(text.ends_with("Outcome: in progress\n"));
    }
}
