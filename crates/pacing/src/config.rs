//! Pacing Configuration
//!
//! Timing knobs for the display pacing scheduler. All durations are stored in
//! milliseconds so the struct round-trips through the monitor's JSON config.

use std::time::Duration;

use case_review_core::{CoreError, CoreResult, Stage};
use serde::{Deserialize, Serialize};

/// Timing configuration for one pacing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause before the first stage's first message.
    pub lead_in_ms: u64,
    /// Base dwell per message for the document inspection stage.
    pub document_inspection_base_ms: u64,
    /// Base dwell per message for the external verification stage.
    /// Must be the longest of the three windows.
    pub external_verification_base_ms: u64,
    /// Base dwell per message for the compliance decision stage.
    pub compliance_decision_base_ms: u64,
    /// Random delays are drawn from `[base, base + base * jitter_ratio]`.
    pub jitter_ratio: f64,
    /// How long the completed view stays up after the terminal signal.
    pub minimum_visible_ms: u64,
    /// Forced teardown measured from session start.
    pub hard_timeout_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            lead_in_ms: 600,
            document_inspection_base_ms: 1_200,
            external_verification_base_ms: 2_000,
            compliance_decision_base_ms: 1_400,
            jitter_ratio: 0.5,
            minimum_visible_ms: 2_500,
            hard_timeout_ms: 30_000,
        }
    }
}

impl PacingConfig {
    /// Same hard timeout, every other wait set to zero. Narration still runs
    /// through every message in order, just without dwelling.
    pub fn without_delays(&self) -> Self {
        Self {
            lead_in_ms: 0,
            document_inspection_base_ms: 0,
            external_verification_base_ms: 0,
            compliance_decision_base_ms: 0,
            jitter_ratio: 0.0,
            minimum_visible_ms: 0,
            hard_timeout_ms: self.hard_timeout_ms,
        }
    }

    pub fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }

    /// Base delay window for messages of `stage`. Intake is never narrated.
    pub fn base_window(&self, stage: Stage) -> Duration {
        let ms = match stage {
            Stage::Intake => 0,
            Stage::DocumentInspection => self.document_inspection_base_ms,
            Stage::ExternalVerification => self.external_verification_base_ms,
            Stage::ComplianceDecision => self.compliance_decision_base_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn minimum_visible(&self) -> Duration {
        Duration::from_millis(self.minimum_visible_ms)
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if self.hard_timeout_ms == 0 {
            return Err(CoreError::validation("hard_timeout_ms must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.jitter_ratio) {
            return Err(CoreError::validation(format!(
                "jitter_ratio must be between 0.0 and 2.0, got {}",
                self.jitter_ratio
            )));
        }
        if self.external_verification_base_ms < self.document_inspection_base_ms
            || self.external_verification_base_ms < self.compliance_decision_base_ms
        {
            return Err(CoreError::validation(
                "external_verification_base_ms must be the longest base window",
            ));
        }
        if self.minimum_visible_ms >= self.hard_timeout_ms {
            return Err(CoreError::validation(
                "minimum_visible_ms must be shorter than hard_timeout_ms",
            ));
        }
        Ok(())
    }
}
