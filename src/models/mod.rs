//! Data Models
//!
//! Serializable configuration models.

pub mod settings;

pub use settings::*;
