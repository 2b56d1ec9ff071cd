//! Activity Event Types
//!
//! The immutable progress events the review pipeline emits for a case. These
//! are the normalized form produced by the transport layer; raw frames never
//! reach the engines.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decision::{Decision, RiskLevel};
use crate::stage::Stage;

/// Pipeline participant that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agent {
    DocumentInspector,
    ExternalVerifier,
    ComplianceOfficer,
    System,
    /// Any agent name this build does not know about. Retained in the raw
    /// log, ignored by the engines.
    #[serde(other)]
    Unknown,
}

impl Agent {
    /// The pipeline stage this agent drives, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Agent::DocumentInspector => Some(Stage::DocumentInspection),
            Agent::ExternalVerifier => Some(Stage::ExternalVerification),
            Agent::ComplianceOfficer => Some(Stage::ComplianceDecision),
            Agent::System | Agent::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Agent::DocumentInspector => "document_inspector",
            Agent::ExternalVerifier => "external_verifier",
            Agent::ComplianceOfficer => "compliance_officer",
            Agent::System => "system",
            Agent::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reported on a single activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Started,
    InProgress,
    Success,
    Warning,
    Error,
    Decision,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Started => "started",
            ActivityStatus::InProgress => "in_progress",
            ActivityStatus::Success => "success",
            ActivityStatus::Warning => "warning",
            ActivityStatus::Error => "error",
            ActivityStatus::Decision => "decision",
        }
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional structured payload attached to an event.
///
/// The typed fields cover the decision payload; everything else the agent
/// attached (quality scores, check results, ...) is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::decision::lenient_decision"
    )]
    pub decision: Option<Decision>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::decision::lenient_risk_level"
    )]
    pub risk_level: Option<RiskLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "confidence_score")]
    pub confidence: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventData {
    /// Payload carrying only a decision outcome.
    pub fn decision(
        decision: Decision,
        risk_level: Option<RiskLevel>,
        confidence: Option<f64>,
    ) -> Self {
        Self {
            decision: Some(decision),
            risk_level,
            confidence,
            extra: Map::new(),
        }
    }

    /// Confidence clamped into `[0, 1]`; non-finite values are discarded.
    pub fn normalized_confidence(&self) -> Option<f64> {
        self.confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
    }
}

/// A single normalized pipeline progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: String,
    pub case_id: String,
    pub agent: Agent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_display_name: Option<String>,
    pub action: String,
    #[serde(default)]
    pub details: String,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
}

impl ActivityEvent {
    pub fn new(
        case_id: impl Into<String>,
        agent: Agent,
        action: impl Into<String>,
        status: ActivityStatus,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            case_id: case_id.into(),
            agent,
            agent_display_name: None,
            action: action.into(),
            details: String::new(),
            status,
            duration_ms: None,
            data: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Stage this event belongs to, `None` for system/unknown agents.
    pub fn stage(&self) -> Option<Stage> {
        self.agent.stage()
    }

    pub fn decision(&self) -> Option<Decision> {
        self.data.as_ref().and_then(|d| d.decision)
    }

    /// Parse the producer's ISO-8601 timestamp. The producer emits naive UTC
    /// timestamps; offset-qualified ones are accepted too.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.naive_utc())
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f").ok())
    }

    /// Identity used to recognise the same producer entry delivered twice
    /// (once through history, once live).
    pub fn identity(&self) -> (String, Agent, String, ActivityStatus) {
        (
            self.timestamp.clone(),
            self.agent,
            self.action.clone(),
            self.status,
        )
    }
}
