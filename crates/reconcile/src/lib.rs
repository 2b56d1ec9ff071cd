//! Case Review Reconcile
//!
//! Turns the arrival-ordered activity stream for one case into a consistent
//! model of stage progress and final outcome:
//!
//! - `event_log` - Bounded, append-only, single-case log (`EventLog`)
//! - `derivation` - Stage-State Derivation Engine (`StageDeriver`, `StageDerivation`)
//! - `decision` - Decision Extraction Engine (`DecisionExtractor`)
//! - `reconciler` - Single writer keeping the log and both engines in step (`Reconciler`)
//!
//! Everything here is synchronous and free of I/O; timing concerns live in
//! the pacing crate.

pub mod decision;
pub mod derivation;
pub mod event_log;
pub mod reconciler;

pub use decision::{
    extract_decision, DecisionExtractor, WORKFLOW_COMPLETE_ACTION, WORKFLOW_ERROR_ACTION,
};
pub use derivation::{
    action_indicates_completion, bridge_missing_start, derive_stages, StageDerivation,
    StageDeriver,
};
pub use event_log::{AppendOutcome, EventLog, LoggedEvent, DEFAULT_CAPACITY};
pub use reconciler::{ProgressSnapshot, Reconciler};
