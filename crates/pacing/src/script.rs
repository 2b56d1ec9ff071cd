//! Narrative Scripts
//!
//! Fixed per-stage message sequences shown while a stage is narrated.

use case_review_core::Stage;
use serde::{Deserialize, Serialize};

/// Scripted messages for each narrated stage, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeScripts {
    pub document_inspection: Vec<String>,
    pub external_verification: Vec<String>,
    pub compliance_decision: Vec<String>,
}

fn lines(messages: &[&str]) -> Vec<String> {
    messages.iter().map(|m| m.to_string()).collect()
}

impl Default for NarrativeScripts {
    fn default() -> Self {
        Self {
            document_inspection: lines(&[
                "Loading identity document",
                "Assessing image quality",
                "Extracting fields from the document",
                "Cross-checking extracted fields against the customer record",
            ]),
            external_verification: lines(&[
                "Submitting Document Verification Service check",
                "Screening politically exposed persons lists",
                "Checking sanctions lists",
                "Consolidating verification results",
            ]),
            compliance_decision: lines(&[
                "Collecting evidence from earlier stages",
                "Assessing risk factors",
                "Weighing mitigating factors",
                "Drafting compliance decision",
            ]),
        }
    }
}

impl NarrativeScripts {
    /// Messages for `stage`. Intake has no narrative.
    pub fn for_stage(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Intake => &[],
            Stage::DocumentInspection => &self.document_inspection,
            Stage::ExternalVerification => &self.external_verification,
            Stage::ComplianceDecision => &self.compliance_decision,
        }
    }

    pub fn message(&self, stage: Stage, index: usize) -> Option<&str> {
        self.for_stage(stage).get(index).map(String::as_str)
    }

    pub fn len(&self, stage: Stage) -> usize {
        self.for_stage(stage).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tracked_stage_has_a_script() {
        let scripts = NarrativeScripts::default();
        for stage in Stage::TRACKED {
            assert!(scripts.len(stage) > 0, "{} has no script", stage);
        }
        assert_eq!(scripts.len(Stage::Intake), 0);
        assert_eq!(scripts.message(Stage::Intake, 0), None);
    }
}
