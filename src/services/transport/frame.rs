//! Inbound Frames
//!
//! Schema of the producer's WebSocket frames and their normalization into
//! `TransportMessage`s. Workflow lifecycle frames become `system` activity
//! events so the engines see a single event shape.

use case_review_core::{
    ActivityEvent, ActivityStatus, Agent, CoreError, CoreResult, Decision, EventData, RiskLevel,
};
use case_review_reconcile::{WORKFLOW_COMPLETE_ACTION, WORKFLOW_ERROR_ACTION};
use serde::Deserialize;

use super::{CaseNotice, ConnectionSignal, NoticeKind, TransportMessage};

/// Action label given to normalized `workflow_started` frames.
pub const WORKFLOW_STARTED_ACTION: &str = "Workflow Started";

/// Raw frame as broadcast by the producer, discriminated by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    AgentActivity(ActivityEvent),
    WorkflowStarted {
        case_id: String,
        #[serde(default)]
        customer_name: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    WorkflowComplete {
        case_id: String,
        #[serde(default)]
        ai_decision: Option<String>,
        #[serde(default)]
        risk_level: Option<String>,
        #[serde(default)]
        confidence_score: Option<f64>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    WorkflowError {
        case_id: String,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Connected,
    Pong,
    NewCase {
        #[serde(default)]
        case_id: Option<String>,
        #[serde(default)]
        customer_name: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    CaseUpdate {
        #[serde(default)]
        case_id: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        decision: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    ActionTaken {
        #[serde(default)]
        case_id: Option<String>,
        #[serde(default)]
        action_type: Option<String>,
        #[serde(default)]
        new_status: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    BulkAction {
        #[serde(default)]
        case_ids: Vec<String>,
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Ack,
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

fn system_event(
    case_id: String,
    action: &str,
    status: ActivityStatus,
    details: Option<String>,
    timestamp: Option<String>,
) -> ActivityEvent {
    let mut event = ActivityEvent::new(case_id, Agent::System, action, status)
        .with_details(details.unwrap_or_default());
    if let Some(ts) = timestamp {
        event = event.with_timestamp(ts);
    }
    event
}

fn describe(parts: &[(&str, &Option<String>)]) -> String {
    parts
        .iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}={}", label, v)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// An activity event must name a case and an action.
fn check_well_formed(event: &ActivityEvent) -> CoreResult<()> {
    if event.case_id.trim().is_empty() {
        return Err(CoreError::parse(format!(
            "'{}' activity without case id",
            event.action
        )));
    }
    if event.action.trim().is_empty() {
        return Err(CoreError::parse(format!(
            "activity for case {} without action",
            event.case_id
        )));
    }
    Ok(())
}

/// Map a parsed frame to the message subscribers receive. `Ok(None)` for
/// frames that carry nothing for subscribers.
pub fn normalize(frame: InboundFrame) -> CoreResult<Option<TransportMessage>> {
    let message = match frame {
        InboundFrame::AgentActivity(event) => TransportMessage::Event(event),
        InboundFrame::WorkflowStarted {
            case_id,
            customer_name,
            message,
            timestamp,
        } => {
            let details = message.or(customer_name);
            TransportMessage::Event(system_event(
                case_id,
                WORKFLOW_STARTED_ACTION,
                ActivityStatus::Started,
                details,
                timestamp,
            ))
        }
        InboundFrame::WorkflowComplete {
            case_id,
            ai_decision,
            risk_level,
            confidence_score,
            message,
            timestamp,
        } => {
            let data = EventData {
                decision: ai_decision.as_deref().and_then(Decision::parse),
                risk_level: risk_level.as_deref().and_then(RiskLevel::parse),
                confidence: confidence_score,
                ..Default::default()
            };
            TransportMessage::Event(
                system_event(
                    case_id,
                    WORKFLOW_COMPLETE_ACTION,
                    ActivityStatus::Decision,
                    message,
                    timestamp,
                )
                .with_data(data),
            )
        }
        InboundFrame::WorkflowError {
            case_id,
            error,
            timestamp,
        } => TransportMessage::Event(system_event(
            case_id,
            WORKFLOW_ERROR_ACTION,
            ActivityStatus::Error,
            error,
            timestamp,
        )),
        InboundFrame::Connected => TransportMessage::Connection(ConnectionSignal::Connected),
        InboundFrame::Pong => TransportMessage::Connection(ConnectionSignal::Heartbeat),
        InboundFrame::NewCase {
            case_id,
            customer_name,
            timestamp,
        } => TransportMessage::Notice(CaseNotice {
            kind: NoticeKind::NewCase,
            case_ids: case_id.into_iter().collect(),
            summary: describe(&[("customer", &customer_name)]),
            timestamp,
        }),
        InboundFrame::CaseUpdate {
            case_id,
            status,
            decision,
            timestamp,
        } => TransportMessage::Notice(CaseNotice {
            kind: NoticeKind::CaseUpdate,
            case_ids: case_id.into_iter().collect(),
            summary: describe(&[("status", &status), ("decision", &decision)]),
            timestamp,
        }),
        InboundFrame::ActionTaken {
            case_id,
            action_type,
            new_status,
            timestamp,
        } => TransportMessage::Notice(CaseNotice {
            kind: NoticeKind::ActionTaken,
            case_ids: case_id.into_iter().collect(),
            summary: describe(&[("action", &action_type), ("status", &new_status)]),
            timestamp,
        }),
        InboundFrame::BulkAction {
            case_ids,
            action,
            timestamp,
        } => TransportMessage::Notice(CaseNotice {
            kind: NoticeKind::BulkAction,
            case_ids,
            summary: describe(&[("action", &action)]),
            timestamp,
        }),
        InboundFrame::Ack => return Ok(None),
        InboundFrame::Error { message } => {
            tracing::debug!(
                "[Transport] Server reported an error: {}",
                message.unwrap_or_default()
            );
            return Ok(None);
        }
        InboundFrame::Unknown => {
            tracing::debug!("[Transport] Ignoring frame of unknown type");
            return Ok(None);
        }
    };

    if let TransportMessage::Event(event) = &message {
        check_well_formed(event)?;
    }
    Ok(Some(message))
}

/// Decode and normalize a text frame.
pub fn decode_frame(text: &str) -> CoreResult<Option<TransportMessage>> {
    let frame: InboundFrame = serde_json::from_str(text)?;
    normalize(frame)
}

/// Like `decode_frame`, but drops malformed input with a warning.
pub fn parse_frame(text: &str) -> Option<TransportMessage> {
    match decode_frame(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("[Transport] Dropping malformed frame: {}", e);
            None
        }
    }
}
