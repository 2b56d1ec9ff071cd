//! Utilities
//!
//! Common utilities used throughout the monitor.

pub mod error;
pub mod paths;

pub use error::*;
pub use paths::*;
