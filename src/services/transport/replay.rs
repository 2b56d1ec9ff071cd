//! Replay Transport
//!
//! Feeds a recorded JSON-lines file of inbound frames through the same
//! normalization path as the live adapter. Each line is either a raw frame
//! exactly as received, or an envelope `{"offset_ms": N, "frame": {...}}`
//! written by `FrameRecorder`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::frame::parse_frame;
use super::{ConnectionSignal, EventTransport, Subscription, TransportError, TransportMessage};

#[derive(Debug, Serialize, Deserialize)]
struct RecordingLine {
    #[serde(default)]
    offset_ms: Option<u64>,
    frame: Value,
}

/// One recorded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    /// Milliseconds since the recording started, when known.
    pub offset_ms: Option<u64>,
    /// Frame text as it would have arrived on the socket.
    pub raw: String,
}

/// Delay policy between replayed frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReplayPace {
    /// Deliver everything back to back.
    #[default]
    Immediate,
    /// The same gap before every frame.
    Fixed(Duration),
    /// Reproduce the recorded offsets; frames without one follow immediately.
    Recorded,
}

#[derive(Debug, Clone)]
pub struct ReplayTransport {
    frames: Vec<RecordedFrame>,
    pace: ReplayPace,
}

impl ReplayTransport {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames,
            pace: ReplayPace::Immediate,
        }
    }

    /// Parse JSON-lines text. Blank lines are skipped; lines that are not
    /// valid frames are kept and dropped at normalization like live input.
    pub fn from_jsonl(text: &str) -> Self {
        let frames = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| match serde_json::from_str::<RecordingLine>(line) {
                Ok(envelope) => RecordedFrame {
                    offset_ms: envelope.offset_ms,
                    raw: envelope.frame.to_string(),
                },
                Err(_) => RecordedFrame {
                    offset_ms: None,
                    raw: line.to_string(),
                },
            })
            .collect();
        Self::new(frames)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let transport = Self::from_jsonl(&text);
        tracing::info!(
            "[Transport] Loaded {} recorded frames from {}",
            transport.frames.len(),
            path.as_ref().display()
        );
        Ok(transport)
    }

    pub fn with_pace(mut self, pace: ReplayPace) -> Self {
        self.pace = pace;
        self
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Case id of the first recorded case event, used when no case is named.
    pub fn first_case_id(&self) -> Option<String> {
        self.frames.iter().find_map(|frame| match parse_frame(&frame.raw) {
            Some(TransportMessage::Event(event)) => Some(event.case_id),
            _ => None,
        })
    }
}

#[async_trait]
impl EventTransport for ReplayTransport {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn subscribe(
        &self,
        sender: mpsc::Sender<TransportMessage>,
    ) -> Result<Subscription, TransportError> {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(replay_loop(
            self.frames.clone(),
            self.pace,
            sender,
            cancel.clone(),
        ));
        Ok(Subscription::new(cancel, handle))
    }
}

async fn deliver(
    tx: &mpsc::Sender<TransportMessage>,
    cancel: &CancellationToken,
    message: TransportMessage,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(message) => sent.is_ok(),
    }
}

async fn replay_loop(
    frames: Vec<RecordedFrame>,
    pace: ReplayPace,
    tx: mpsc::Sender<TransportMessage>,
    cancel: CancellationToken,
) {
    if !deliver(&tx, &cancel, TransportMessage::Connection(ConnectionSignal::Connected)).await {
        return;
    }

    let mut previous_offset = 0u64;
    for frame in &frames {
        let delay = match pace {
            ReplayPace::Immediate => Duration::ZERO,
            ReplayPace::Fixed(gap) => gap,
            ReplayPace::Recorded => match frame.offset_ms {
                Some(offset) => {
                    let gap = offset.saturating_sub(previous_offset);
                    previous_offset = previous_offset.max(offset);
                    Duration::from_millis(gap)
                }
                None => Duration::ZERO,
            },
        };

        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return;
        }

        let Some(message) = parse_frame(&frame.raw) else {
            continue;
        };
        if !deliver(&tx, &cancel, message).await {
            return;
        }
    }

    tracing::debug!("[Transport] Replay of {} frames finished", frames.len());
    deliver(&tx, &cancel, TransportMessage::Connection(ConnectionSignal::Disconnected)).await;
}

/// Appends received frames to a JSON-lines recording with their offsets.
#[derive(Debug)]
pub struct FrameRecorder {
    file: tokio::fs::File,
    started: Instant,
    recorded: u64,
}

impl FrameRecorder {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(path).await?;
        tracing::info!("[Transport] Recording frames to {}", path.display());
        Ok(Self {
            file,
            started: Instant::now(),
            recorded: 0,
        })
    }

    pub async fn record(&mut self, raw: &str) -> Result<(), TransportError> {
        let frame = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        let line = RecordingLine {
            offset_ms: Some(self.started.elapsed().as_millis() as u64),
            frame,
        };
        let mut text = serde_json::to_string(&line).map_err(std::io::Error::from)?;
        text.push('\n');
        self.file.write_all(text.as_bytes()).await?;
        self.file.flush().await?;
        self.recorded += 1;
        Ok(())
    }

    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}
