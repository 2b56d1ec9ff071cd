//! Case Monitor
//!
//! Host runtime wiring transport, history, reconciliation and pacing for the
//! observed case.
//!
//! - `session` - Per-case state and message handling (`CaseSession`)
//! - `runner` - Single-threaded `select!` loop and its handle (`CaseMonitor`)

pub mod runner;
pub mod session;

pub use runner::{CaseMonitor, DelayFactory, MonitorCommand, MonitorHandle};
pub use session::{CaseSession, SessionUpdate};
