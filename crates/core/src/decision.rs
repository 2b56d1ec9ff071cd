//! Decision Types
//!
//! Final outcome types for a case review. A `decision`-status event feeds two
//! independently derived values (the compliance stage's status and the
//! pipeline-wide final decision); only the latter is modeled here.

use serde::{Deserialize, Deserializer, Serialize};

/// Outcome recommended by the compliance officer agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Approve,
    Reject,
    Escalate,
}

impl Decision {
    /// Case-insensitive parse; unrecognised values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPROVE" | "APPROVED" => Some(Decision::Approve),
            "REJECT" | "REJECTED" => Some(Decision::Reject),
            "ESCALATE" | "ESCALATED" => Some(Decision::Escalate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "APPROVE",
            Decision::Reject => "REJECT",
            Decision::Escalate => "ESCALATE",
        }
    }

    /// Whether this outcome needs a human reviewer rather than a banner.
    pub fn requires_human_review(&self) -> bool {
        matches!(self, Decision::Escalate)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assessed risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(RiskLevel::Low),
            "MEDIUM" => Some(RiskLevel::Medium),
            "HIGH" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline's final outcome for a case. Immutable once taken from the
/// compliance officer's decision event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl FinalDecision {
    /// Confidence as a whole percentage, e.g. `0.95` -> `95`.
    pub fn confidence_percent(&self) -> Option<u8> {
        self.confidence.map(confidence_percent)
    }
}

/// Where decision extraction stands for the observed case.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DecisionState {
    /// No terminal signal observed yet.
    #[default]
    Pending,
    /// An authoritative outcome was extracted.
    Resolved { decision: FinalDecision },
    /// A terminal signal arrived but no outcome could be extracted from it.
    Unknown,
}

impl DecisionState {
    pub fn final_decision(&self) -> Option<&FinalDecision> {
        match self {
            DecisionState::Resolved { decision } => Some(decision),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !matches!(self, DecisionState::Pending)
    }
}

/// Convert a `[0, 1]` confidence to a rounded percentage.
pub fn confidence_percent(confidence: f64) -> u8 {
    if !confidence.is_finite() {
        return 0;
    }
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub(crate) fn lenient_decision<'de, D>(deserializer: D) -> Result<Option<Decision>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Decision::parse))
}

pub(crate) fn lenient_risk_level<'de, D>(deserializer: D) -> Result<Option<RiskLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(RiskLevel::parse))
}
