//! Decision Extraction Engine
//!
//! Produces at most one `FinalDecision` per case from the event stream and
//! never retracts or overwrites it. Computed independently of the stage
//! engine even though both read the same `decision`-status events.

use case_review_core::{
    ActivityEvent, ActivityStatus, Agent, DecisionState, FinalDecision,
};

use crate::event_log::EventLog;

/// Action label of the pipeline-wide completion event.
pub const WORKFLOW_COMPLETE_ACTION: &str = "Workflow Complete";

/// Action label of the pipeline-wide failure event.
pub const WORKFLOW_ERROR_ACTION: &str = "Workflow Error";

/// How an event bears on decision extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Signal {
    /// The compliance officer's decision event with a payload.
    Authoritative(FinalDecision),
    /// A workflow-completion event with a payload.
    Fallback(FinalDecision),
    /// Terminal, but nothing to extract.
    TerminalWithoutPayload,
}

fn payload(event: &ActivityEvent) -> Option<FinalDecision> {
    let data = event.data.as_ref()?;
    Some(FinalDecision {
        decision: data.decision?,
        risk_level: data.risk_level,
        confidence: data.normalized_confidence(),
    })
}

fn classify(event: &ActivityEvent) -> Option<Signal> {
    let authoritative_shape =
        event.agent == Agent::ComplianceOfficer && event.status == ActivityStatus::Decision;
    if authoritative_shape {
        return Some(match payload(event) {
            Some(decision) => Signal::Authoritative(decision),
            None => Signal::TerminalWithoutPayload,
        });
    }

    if event.action == WORKFLOW_COMPLETE_ACTION {
        return Some(match payload(event) {
            Some(decision) => Signal::Fallback(decision),
            None => Signal::TerminalWithoutPayload,
        });
    }

    if event.action == WORKFLOW_ERROR_ACTION && event.status == ActivityStatus::Error {
        return Some(Signal::TerminalWithoutPayload);
    }

    None
}

/// Where the current decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Authoritative,
    Fallback,
}

/// Incremental, idempotent decision extractor.
///
/// The authoritative source is the first compliance-officer `decision` event
/// carrying `data.decision`; the first `Workflow Complete` event with a
/// payload is the fallback. A fallback decision holds only until an
/// authoritative one arrives, which may happen after it since the producer
/// broadcasts the two on separate paths. An authoritative decision is final.
#[derive(Debug, Clone, Default)]
pub struct DecisionExtractor {
    state: DecisionState,
    source: Option<Source>,
    duplicates: u32,
}

impl DecisionExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a whole log in arrival order.
    pub fn from_log(log: &EventLog) -> Self {
        let mut extractor = Self::new();
        for event in log.events() {
            extractor.observe(event);
        }
        extractor
    }

    /// Feed one event; returns `true` when the state changed.
    pub fn observe(&mut self, event: &ActivityEvent) -> bool {
        let Some(signal) = classify(event) else {
            return false;
        };

        match (self.state, signal) {
            (DecisionState::Resolved { .. }, Signal::TerminalWithoutPayload) => false,
            (DecisionState::Resolved { decision: existing }, Signal::Authoritative(decision))
                if self.source == Some(Source::Fallback) =>
            {
                tracing::info!(
                    "[Decision] Case {} officer decision {} supersedes workflow fallback {}",
                    event.case_id,
                    decision.decision,
                    existing.decision
                );
                self.state = DecisionState::Resolved { decision };
                self.source = Some(Source::Authoritative);
                decision != existing
            }
            (DecisionState::Resolved { decision: existing }, Signal::Authoritative(_) | Signal::Fallback(_)) => {
                self.duplicates += 1;
                tracing::debug!(
                    "[Decision] Ignoring repeated decision for case {}, keeping {}",
                    event.case_id,
                    existing.decision
                );
                false
            }
            (_, Signal::Authoritative(decision) | Signal::Fallback(decision)) => {
                tracing::info!(
                    "[Decision] Case {} resolved: {} (risk {:?}, confidence {:?})",
                    event.case_id,
                    decision.decision,
                    decision.risk_level,
                    decision.confidence
                );
                self.state = DecisionState::Resolved { decision };
                self.source = Some(match signal {
                    Signal::Authoritative(_) => Source::Authoritative,
                    _ => Source::Fallback,
                });
                true
            }
            (DecisionState::Pending, Signal::TerminalWithoutPayload) => {
                tracing::warn!(
                    "[Decision] Case {} reported '{}' without a decision payload",
                    event.case_id,
                    event.action
                );
                self.state = DecisionState::Unknown;
                true
            }
            (DecisionState::Unknown, Signal::TerminalWithoutPayload) => false,
        }
    }

    pub fn state(&self) -> DecisionState {
        self.state
    }

    pub fn final_decision(&self) -> Option<FinalDecision> {
        self.state.final_decision().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Matching decision events that arrived after the decision was set.
    pub fn duplicates(&self) -> u32 {
        self.duplicates
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One-shot extraction over a log.
pub fn extract_decision(log: &EventLog) -> DecisionState {
    DecisionExtractor::from_log(log).state()
}
