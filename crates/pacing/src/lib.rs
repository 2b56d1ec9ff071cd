//! Case Review Pacing
//!
//! Slows the presentation of a case down so a reviewer can follow it:
//!
//! - `config` - Timing knobs (`PacingConfig`)
//! - `script` - Per-stage narrative messages (`NarrativeScripts`)
//! - `delay` - Injectable per-message delay source (`DelayGenerator`)
//! - `scheduler` - Pure pacing state machine (`PacingScheduler`)
//! - `timers` - `DelayQueue` wrapper the async host drives (`TimerQueue`)

pub mod config;
pub mod delay;
pub mod scheduler;
pub mod script;
pub mod timers;

pub use config::PacingConfig;
pub use delay::{DelayGenerator, FixedDelay, RandomDelay};
pub use scheduler::{
    CloseReason, Narration, PacingEffect, PacingPhase, PacingScheduler, PacingState, TimerId,
    TimerKind,
};
pub use script::NarrativeScripts;
pub use timers::TimerQueue;
