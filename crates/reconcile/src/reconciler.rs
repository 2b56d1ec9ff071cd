//! Reconciler
//!
//! Single writer over the event log that keeps both engines in step with it.
//! Every accepted event goes to the log, the stage engine, and the decision
//! engine in that order, one at a time.

use case_review_core::{ActivityEvent, DecisionState, FinalDecision};
use serde::{Deserialize, Serialize};

use crate::decision::DecisionExtractor;
use crate::derivation::{StageDerivation, StageDeriver};
use crate::event_log::{AppendOutcome, EventLog};

/// Combined engine output for the observed case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub case_id: Option<String>,
    pub derivation: StageDerivation,
    pub decision: DecisionState,
    /// Events currently retained in the log.
    pub event_count: usize,
}

impl ProgressSnapshot {
    pub fn final_decision(&self) -> Option<&FinalDecision> {
        self.decision.final_decision()
    }

    pub fn is_complete(&self) -> bool {
        self.decision.is_complete()
    }

    /// The final stage is terminal or the pipeline signalled completion.
    pub fn has_terminal_signal(&self) -> bool {
        self.derivation.final_stage_terminal() || self.decision.is_complete()
    }
}

/// Owns the event log and both derivation engines for one case at a time.
#[derive(Debug, Clone)]
pub struct Reconciler {
    log: EventLog,
    stages: StageDeriver,
    decision: DecisionExtractor,
}

impl Reconciler {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: EventLog::new(capacity),
            stages: StageDeriver::new(),
            decision: DecisionExtractor::new(),
        }
    }

    /// Observe `case_id`. A different case clears everything first.
    pub fn attach(&mut self, case_id: impl Into<String>) {
        let case_id = case_id.into();
        if self.log.case_id() == Some(case_id.as_str()) {
            return;
        }
        self.stages.reset();
        self.decision.reset();
        self.log.attach(case_id);
    }

    pub fn detach(&mut self) {
        self.log.detach();
        self.stages.reset();
        self.decision.reset();
    }

    pub fn case_id(&self) -> Option<&str> {
        self.log.case_id()
    }

    /// Offer an event. Events for other cases are dropped before they reach
    /// either engine.
    pub fn ingest(&mut self, event: ActivityEvent) -> AppendOutcome {
        let outcome = self.log.append(event.clone());
        if let AppendOutcome::Appended { evicted, .. } = outcome {
            if evicted {
                tracing::debug!(
                    "[Reconcile] Log for case {} at capacity {}, oldest entry dropped",
                    event.case_id,
                    self.log.capacity()
                );
            }
            self.stages.observe(&event);
            self.decision.observe(&event);
        }
        outcome
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn derivation(&self) -> StageDerivation {
        self.stages.derive()
    }

    pub fn decision(&self) -> DecisionState {
        self.decision.state()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            case_id: self.log.case_id().map(str::to_string),
            derivation: self.stages.derive(),
            decision: self.decision.state(),
            event_count: self.log.len(),
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(crate::event_log::DEFAULT_CAPACITY)
    }
}
