//! Case Review Core
//!
//! Foundational types for the case review monitor workspace. This crate has
//! zero dependencies on transport, HTTP, or runtime code.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `event` - Normalized pipeline progress events (`ActivityEvent`, `Agent`, `ActivityStatus`)
//! - `stage` - Fixed pipeline stages and derived stage status (`Stage`, `StageStatus`, `StageState`)
//! - `decision` - Final outcome types (`Decision`, `RiskLevel`, `FinalDecision`, `DecisionState`)

pub mod decision;
pub mod error;
pub mod event;
pub mod stage;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Events ─────────────────────────────────────────────────────────────
pub use event::{ActivityEvent, ActivityStatus, Agent, EventData};

// ── Stages ─────────────────────────────────────────────────────────────
pub use stage::{Stage, StageState, StageStatus};

// ── Decisions ──────────────────────────────────────────────────────────
pub use decision::{confidence_percent, Decision, DecisionState, FinalDecision, RiskLevel};
