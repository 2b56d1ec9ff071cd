//! Stage-State Derivation Engine
//!
//! Maps the arrival-ordered event stream to exactly one status per fixed
//! stage. Each stage keeps a set of monotonic signals (flags that are only
//! ever raised), and the status is read from those signals with a fixed
//! priority, first match wins:
//!
//! 1. no events: `pending`, or `active` when the predecessor is terminal
//!    (see [`bridge_missing_start`])
//! 2. any `error` event: `error`
//! 3. a completion-flavoured `warning`, or a completion-flavoured
//!    `decision` carrying ESCALATE: `warning`
//! 4. any event carrying ESCALATE: `escalated`
//! 5. any `success` event, or a `decision` carrying APPROVE: `success`
//! 6. otherwise: `active`
//!
//! Because signals are never lowered, a status that reached `error` stays
//! `error` for every later query, even after the triggering event has been
//! evicted from the bounded log.

use case_review_core::{
    ActivityEvent, ActivityStatus, Decision, EventData, Stage, StageState, StageStatus,
};
use serde::{Deserialize, Serialize};

use crate::event_log::EventLog;

/// Action fragments that mark an event as closing out its stage.
const COMPLETION_MARKERS: &[&str] = &["complete", "finished", "done", "skipped"];

/// Whether an action label carries completion semantics
/// (e.g. "Verification Complete", "Verification Skipped").
pub fn action_indicates_completion(action: &str) -> bool {
    let action = action.to_ascii_lowercase();
    COMPLETION_MARKERS.iter().any(|m| action.contains(m))
}

/// Status of a stage that has produced no events yet.
///
/// The producer never emits explicit stage-start markers, so a stage is
/// considered running as soon as its predecessor has reached a terminal
/// status.
pub fn bridge_missing_start(predecessor: StageStatus) -> StageStatus {
    if predecessor.is_terminal() {
        StageStatus::Active
    } else {
        StageStatus::Pending
    }
}

/// Monotonic evidence collected for one stage.
#[derive(Debug, Clone, Default, PartialEq)]
struct StageSignals {
    seen: bool,
    error: bool,
    completion_warning: bool,
    any_warning: bool,
    escalated: bool,
    success: bool,
    details: Option<String>,
    data: Option<EventData>,
    duration_ms: Option<u64>,
    confidence: Option<f64>,
}

impl StageSignals {
    fn observe(&mut self, event: &ActivityEvent) {
        self.seen = true;

        let decision = event.decision();
        let completes = action_indicates_completion(&event.action);

        match event.status {
            ActivityStatus::Error => self.error = true,
            ActivityStatus::Warning => {
                self.any_warning = true;
                if completes {
                    self.completion_warning = true;
                }
            }
            ActivityStatus::Success => self.success = true,
            ActivityStatus::Decision => match decision {
                Some(Decision::Escalate) if completes => self.completion_warning = true,
                Some(Decision::Approve) => self.success = true,
                _ => {}
            },
            ActivityStatus::Started | ActivityStatus::InProgress => {}
        }

        if decision == Some(Decision::Escalate) {
            self.escalated = true;
        }

        if !event.details.is_empty() {
            self.details = Some(event.details.clone());
        }
        if let Some(data) = &event.data {
            if let Some(confidence) = data.normalized_confidence() {
                self.confidence = Some(confidence);
            }
            self.data = Some(data.clone());
        }
        if event.duration_ms.is_some() {
            self.duration_ms = event.duration_ms;
        }
    }

    /// Status from the stage's own events; `None` when it has none.
    fn own_status(&self) -> Option<StageStatus> {
        if !self.seen {
            None
        } else if self.error {
            Some(StageStatus::Error)
        } else if self.completion_warning {
            Some(StageStatus::Warning)
        } else if self.escalated {
            Some(StageStatus::Escalated)
        } else if self.success {
            Some(StageStatus::Success)
        } else {
            Some(StageStatus::Active)
        }
    }

    /// Terminal status assumed when a later stage has already reported.
    fn inferred_terminal(&self) -> StageStatus {
        if self.any_warning {
            StageStatus::Warning
        } else {
            StageStatus::Success
        }
    }
}

/// Derived view over all stages plus the global current thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDerivation {
    /// Every stage, intake first, in pipeline order.
    pub stages: Vec<StageState>,
    /// Details of the most recently received stage event (single slot,
    /// last-write-wins across stages).
    pub current_thought: Option<String>,
}

impl StageDerivation {
    pub fn get(&self, stage: Stage) -> &StageState {
        &self.stages[stage.index()]
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.get(stage).status
    }

    /// First tracked stage that is not terminal yet.
    pub fn current_stage(&self) -> Option<Stage> {
        Stage::TRACKED
            .into_iter()
            .find(|s| !self.status(*s).is_terminal())
    }

    pub fn final_stage_terminal(&self) -> bool {
        self.status(Stage::ComplianceDecision).is_terminal()
    }
}

/// Incremental stage-state engine.
#[derive(Debug, Clone, Default)]
pub struct StageDeriver {
    signals: [StageSignals; 3],
    current_thought: Option<String>,
    ignored: u64,
}

impl StageDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a log by replaying its entries in arrival order.
    pub fn from_log(log: &EventLog) -> Self {
        let mut deriver = Self::new();
        for event in log.events() {
            deriver.observe(event);
        }
        deriver
    }

    fn slot(stage: Stage) -> Option<usize> {
        match stage {
            Stage::Intake => None,
            other => Some(other.index() - 1),
        }
    }

    /// Feed one event. Events from agents outside the stage set are
    /// counted and otherwise ignored.
    pub fn observe(&mut self, event: &ActivityEvent) {
        let Some(idx) = event.stage().and_then(Self::slot) else {
            self.ignored += 1;
            return;
        };
        self.signals[idx].observe(event);
        if !event.details.is_empty() {
            self.current_thought = Some(event.details.clone());
        }
    }

    /// Events ignored because their agent drives no stage.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    pub fn current_thought(&self) -> Option<&str> {
        self.current_thought.as_deref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Compute the status of every stage.
    pub fn derive(&self) -> StageDerivation {
        let own: Vec<Option<StageStatus>> =
            self.signals.iter().map(StageSignals::own_status).collect();

        // A stage that reported on its own implies every earlier stage is done.
        let last_seen = self.signals.iter().rposition(|s| s.seen);

        let mut stages = Vec::with_capacity(Stage::ALL.len());
        stages.push(StageState::intake());
        let mut predecessor = StageStatus::Success;

        for (idx, stage) in Stage::TRACKED.into_iter().enumerate() {
            let signals = &self.signals[idx];
            let mut inferred = false;

            let status = match own[idx] {
                Some(status) if status.is_terminal() => status,
                status if last_seen.is_some_and(|last| idx < last) => {
                    inferred = status.is_none() || status == Some(StageStatus::Active);
                    signals.inferred_terminal()
                }
                Some(status) => status,
                None => bridge_missing_start(predecessor),
            };

            stages.push(StageState {
                stage,
                status,
                details: signals.details.clone(),
                data: signals.data.clone(),
                duration_ms: signals.duration_ms,
                confidence: signals.confidence,
                inferred,
            });
            predecessor = status;
        }

        StageDerivation {
            stages,
            current_thought: self.current_thought.clone(),
        }
    }
}

/// One-shot derivation over a log.
pub fn derive_stages(log: &EventLog) -> StageDerivation {
    StageDeriver::from_log(log).derive()
}
