//! Storage Layer
//!
//! Persistent configuration for the monitor.

pub mod config;

pub use config::*;
