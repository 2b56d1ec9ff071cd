//! Shared helpers for building recorded pipeline runs.

use std::time::Duration;

use case_review_monitor::models::settings::MonitorConfig;
use case_review_monitor::services::monitor::CaseMonitor;
use case_review_monitor::services::presentation::{ConnectionState, MonitorView};
use case_review_monitor::services::transport::{ReplayPace, ReplayTransport};
use case_review_pacing::{DelayGenerator, FixedDelay, PacingConfig};
use serde_json::{json, Value};
use std::sync::Arc;

/// Builds a JSON-lines recording one frame at a time.
#[derive(Default)]
pub struct Recording {
    case_id: String,
    lines: Vec<String>,
    clock: u32,
}

impl Recording {
    pub fn new(case_id: &str) -> Self {
        let mut recording = Self {
            case_id: case_id.to_string(),
            ..Default::default()
        };
        recording.push(json!({"type": "connected", "message": "Connected to ACIP Dashboard"}));
        recording
    }

    fn push(&mut self, frame: Value) {
        self.lines.push(frame.to_string());
    }

    fn timestamp(&mut self) -> String {
        self.clock += 1;
        format!("2026-01-05T10:00:{:02}.000000", self.clock)
    }

    pub fn started(mut self) -> Self {
        let ts = self.timestamp();
        self.push(json!({
            "type": "workflow_started",
            "case_id": self.case_id,
            "customer_name": "Jane Citizen",
            "message": "ACIP verification started",
            "timestamp": ts,
        }));
        self
    }

    pub fn activity(self, agent: &str, action: &str, status: &str, details: &str) -> Self {
        self.activity_with(agent, action, status, details, Value::Null)
    }

    pub fn activity_with(
        mut self,
        agent: &str,
        action: &str,
        status: &str,
        details: &str,
        data: Value,
    ) -> Self {
        let ts = self.timestamp();
        self.push(json!({
            "type": "agent_activity",
            "timestamp": ts,
            "case_id": self.case_id,
            "agent": agent,
            "action": action,
            "details": details,
            "status": status,
            "duration_ms": 250,
            "data": data,
        }));
        self
    }

    pub fn decision(self, decision: &str, risk: &str, confidence: f64) -> Self {
        self.activity_with(
            "compliance_officer",
            "Decision Made",
            "decision",
            &format!("Decision: {}", decision),
            json!({"decision": decision, "risk_level": risk, "confidence": confidence}),
        )
    }

    pub fn complete(mut self, decision: Option<&str>, risk: &str, confidence: f64) -> Self {
        let ts = self.timestamp();
        self.push(json!({
            "type": "workflow_complete",
            "case_id": self.case_id,
            "customer_name": "Jane Citizen",
            "status": "completed",
            "risk_level": risk,
            "ai_decision": decision,
            "confidence_score": confidence,
            "message": "Workflow finished",
            "timestamp": ts,
        }));
        self
    }

    pub fn error(mut self, error: &str) -> Self {
        let ts = self.timestamp();
        self.push(json!({
            "type": "workflow_error",
            "case_id": self.case_id,
            "error": error,
            "timestamp": ts,
        }));
        self
    }

    /// Document inspection and external verification both succeed.
    pub fn clean_checks(self) -> Self {
        self.activity("document_inspector", "Document Inspection Started", "started", "Loading documents")
            .activity("document_inspector", "Extracting Data", "in_progress", "Running OCR on passport")
            .activity_with(
                "document_inspector",
                "Extraction Complete",
                "success",
                "All fields extracted",
                json!({"confidence": 0.95}),
            )
            .activity("external_verifier", "Verification Started", "started", "Contacting DVS")
            .activity("external_verifier", "Verification Complete", "success", "DVS matched, PEP clear")
            .activity("compliance_officer", "Reviewing Findings", "in_progress", "Weighing evidence")
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn transport(&self) -> ReplayTransport {
        ReplayTransport::from_jsonl(&self.text())
    }
}

/// Monitor with a fixed per-message delay and no history source.
pub fn monitor(transport: ReplayTransport, pace: ReplayPace, message_delay: Duration) -> CaseMonitor {
    let mut config = MonitorConfig::default();
    config.history_backfill = false;
    CaseMonitor::new(config, Arc::new(transport.with_pace(pace))).with_delays(
        move |_: &PacingConfig| -> Box<dyn DelayGenerator> { Box::new(FixedDelay::of(message_delay)) },
    )
}

/// Replay a recording to completion and return the settled view.
pub async fn run(monitor: CaseMonitor, case_id: &str) -> MonitorView {
    let mut handle = monitor.spawn();
    handle.watch(case_id).await.unwrap();
    let view = handle
        .wait_until(case_id, |view| {
            view.closed.is_some() && view.connection == ConnectionState::Disconnected
        })
        .await
        .unwrap();
    handle.shutdown().await;
    view
}
