//! Stage Types
//!
//! The fixed, ordered phases of a case review and the status each one can be
//! derived to.

use serde::{Deserialize, Serialize};

use crate::event::{Agent, EventData};

/// Pipeline stage. `Intake` is implicit and always successful; the remaining
/// three are driven by one agent each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    DocumentInspection,
    ExternalVerification,
    ComplianceDecision,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Intake,
        Stage::DocumentInspection,
        Stage::ExternalVerification,
        Stage::ComplianceDecision,
    ];

    /// The three agent-driven stages in pipeline order.
    pub const TRACKED: [Stage; 3] = [
        Stage::DocumentInspection,
        Stage::ExternalVerification,
        Stage::ComplianceDecision,
    ];

    pub fn index(&self) -> usize {
        match self {
            Stage::Intake => 0,
            Stage::DocumentInspection => 1,
            Stage::ExternalVerification => 2,
            Stage::ComplianceDecision => 3,
        }
    }

    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Intake => None,
            Stage::DocumentInspection => Some(Stage::Intake),
            Stage::ExternalVerification => Some(Stage::DocumentInspection),
            Stage::ComplianceDecision => Some(Stage::ExternalVerification),
        }
    }

    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Intake => Some(Stage::DocumentInspection),
            Stage::DocumentInspection => Some(Stage::ExternalVerification),
            Stage::ExternalVerification => Some(Stage::ComplianceDecision),
            Stage::ComplianceDecision => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Stage::ComplianceDecision)
    }

    /// Agent that reports progress for this stage.
    pub fn agent(&self) -> Option<Agent> {
        match self {
            Stage::Intake => None,
            Stage::DocumentInspection => Some(Agent::DocumentInspector),
            Stage::ExternalVerification => Some(Agent::ExternalVerifier),
            Stage::ComplianceDecision => Some(Agent::ComplianceOfficer),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Intake => "Case Intake",
            Stage::DocumentInspection => "Document Inspection",
            Stage::ExternalVerification => "External Verification",
            Stage::ComplianceDecision => "Compliance Decision",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Intake => write!(f, "intake"),
            Stage::DocumentInspection => write!(f, "document_inspection"),
            Stage::ExternalVerification => write!(f, "external_verification"),
            Stage::ComplianceDecision => write!(f, "compliance_decision"),
        }
    }
}

/// Derived status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Active,
    Success,
    Warning,
    Error,
    /// Terminal, routed to human review rather than a generic warning.
    Escalated,
}

impl StageStatus {
    /// Terminal statuses never change again within a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Success | StageStatus::Warning | StageStatus::Error | StageStatus::Escalated
        )
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "pending"),
            StageStatus::Active => write!(f, "active"),
            StageStatus::Success => write!(f, "success"),
            StageStatus::Warning => write!(f, "warning"),
            StageStatus::Error => write!(f, "error"),
            StageStatus::Escalated => write!(f, "escalated"),
        }
    }
}

/// Derived state of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    pub stage: Stage,
    pub status: StageStatus,
    /// Latest non-empty details reported for the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Most recent non-empty payload for the stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Set when the status was inferred from later-stage activity rather
    /// than from the stage's own events.
    #[serde(default)]
    pub inferred: bool,
}

impl StageState {
    pub fn new(stage: Stage, status: StageStatus) -> Self {
        Self {
            stage,
            status,
            details: None,
            data: None,
            duration_ms: None,
            confidence: None,
            inferred: false,
        }
    }

    pub fn intake() -> Self {
        Self::new(Stage::Intake, StageStatus::Success)
    }
}
