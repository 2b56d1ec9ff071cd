//! Integration Tests Module
//!
//! End-to-end tests for the case review monitor: recorded pipeline runs fed
//! through the monitor runtime, case switching, and replay determinism.

// Recording builders shared by the tests below
mod support;

// Pipeline scenarios driven through the monitor runtime
mod scenarios_test;

// Case switching and timer cancellation
mod case_switch_test;

// Replay determinism across delivery and pacing speeds
mod replay_test;
