//! Event Transport
//!
//! Boundary between the producer's frame stream and the engines. Adapters
//! normalize raw frames into `TransportMessage`s and push them through an
//! mpsc channel; malformed frames never leave the adapter.
//!
//! - `frame` - Inbound frame schema and normalization
//! - `websocket` - Live WebSocket adapter with reconnect and keep-alive
//! - `replay` - Recorded JSON-lines adapter and frame recorder

pub mod frame;
pub mod replay;
pub mod websocket;

use async_trait::async_trait;
use case_review_core::ActivityEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use frame::{decode_frame, normalize, parse_frame, InboundFrame};
pub use replay::{FrameRecorder, RecordedFrame, ReplayPace, ReplayTransport};
pub use websocket::{WebSocketConfig, WebSocketTransport};

/// Liveness of the underlying stream. Never mutates engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionSignal {
    Connected,
    Disconnected,
    /// Keep-alive answered.
    Heartbeat,
    /// Keep-alive unanswered for too many intervals.
    Stale,
}

/// Kind of case-list notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    NewCase,
    CaseUpdate,
    ActionTaken,
    BulkAction,
}

/// Case-list notification. Logged by the host, never fed to the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseNotice {
    pub kind: NoticeKind,
    /// Cases the notice concerns; a bulk action can name several.
    pub case_ids: Vec<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl CaseNotice {
    pub fn concerns(&self, case_id: &str) -> bool {
        self.case_ids.iter().any(|id| id == case_id)
    }
}

/// Normalized message delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportMessage {
    Event(ActivityEvent),
    Connection(ConnectionSignal),
    Notice(CaseNotice),
}

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Transport closed")]
    Closed,

    #[error("Recording error: {0}")]
    Recording(#[from] std::io::Error),

    #[error("Malformed recording at line {line}: {reason}")]
    MalformedRecording { line: usize, reason: String },
}

/// Live attachment to a transport. Dropping it, or calling `unsubscribe`,
/// detaches synchronously: the delivery task observes the cancelled token
/// before it sends anything else.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(cancel: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn unsubscribe(self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the delivery task to finish on its own.
    pub async fn finished(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("[Transport] Delivery task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Source of normalized case events.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Start delivering messages into `sender`. The adapter spawns its own
    /// delivery task and stops when the returned subscription is dropped or
    /// the receiver goes away.
    async fn subscribe(
        &self,
        sender: mpsc::Sender<TransportMessage>,
    ) -> Result<Subscription, TransportError>;
}
