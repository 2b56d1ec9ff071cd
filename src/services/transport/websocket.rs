//! WebSocket Transport
//!
//! Live adapter for the producer's `/ws/cases` broadcast. Reconnects on a
//! fixed interval without limit and sends a plain-text `ping` keep-alive;
//! liveness changes surface as `ConnectionSignal`s only.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::frame::parse_frame;
use super::replay::FrameRecorder;
use super::{ConnectionSignal, EventTransport, Subscription, TransportError, TransportMessage};
use crate::models::settings::MonitorConfig;

/// Text sent as keep-alive; the producer answers with a `pong` frame.
pub const KEEPALIVE_PING: &str = "ping";

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: String,
    pub reconnect_interval: Duration,
    pub keepalive_interval: Duration,
    /// Unanswered keep-alives before the connection is reported stale.
    pub stale_after_missed: u32,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for WebSocketConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            url: config.ws_url.clone(),
            reconnect_interval: Duration::from_secs(config.reconnect_interval_secs),
            keepalive_interval: Duration::from_secs(config.keepalive_interval_secs),
            stale_after_missed: config.stale_after_missed,
        }
    }
}

pub struct WebSocketTransport {
    config: WebSocketConfig,
    record_to: Option<PathBuf>,
}

impl WebSocketTransport {
    pub fn new(config: WebSocketConfig) -> Result<Self, TransportError> {
        if !(config.url.starts_with("ws://") || config.url.starts_with("wss://")) {
            return Err(TransportError::InvalidUrl(config.url));
        }
        if config.keepalive_interval.is_zero() {
            return Err(TransportError::Connect(
                "keep-alive interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            record_to: None,
        })
    }

    /// Also append every text frame received to a JSON-lines recording.
    pub fn with_recording(mut self, path: impl Into<PathBuf>) -> Self {
        self.record_to = Some(path.into());
        self
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

#[async_trait]
impl EventTransport for WebSocketTransport {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn subscribe(
        &self,
        sender: mpsc::Sender<TransportMessage>,
    ) -> Result<Subscription, TransportError> {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(connection_loop(
            self.config.clone(),
            self.record_to.clone(),
            sender,
            cancel.clone(),
        ));
        Ok(Subscription::new(cancel, handle))
    }
}

/// How a connected session ended.
enum SessionEnd {
    Cancelled,
    ReceiverGone,
    Disconnected,
}

async fn connection_loop(
    config: WebSocketConfig,
    record_to: Option<PathBuf>,
    tx: mpsc::Sender<TransportMessage>,
    cancel: CancellationToken,
) {
    let mut recorder = match record_to {
        Some(path) => match FrameRecorder::create(&path).await {
            Ok(recorder) => Some(recorder),
            Err(e) => {
                tracing::warn!(
                    "[Transport] Recording to {} disabled: {}",
                    path.display(),
                    e
                );
                None
            }
        },
        None => None,
    };
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        let connect = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect_async(config.url.as_str()) => result,
        };

        match connect {
            Ok((stream, _)) => {
                tracing::info!("[Transport] Connected to {}", config.url);
                attempt = 0;
                if tx
                    .send(TransportMessage::Connection(ConnectionSignal::Connected))
                    .await
                    .is_err()
                {
                    break;
                }
                match pump(stream, &config, recorder.as_mut(), &tx, &cancel).await {
                    SessionEnd::Cancelled | SessionEnd::ReceiverGone => break,
                    SessionEnd::Disconnected => {
                        tracing::warn!(
                            "[Transport] Disconnected from {}, retrying in {:?}",
                            config.url,
                            config.reconnect_interval
                        );
                        if tx
                            .send(TransportMessage::Connection(ConnectionSignal::Disconnected))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "[Transport] Connect attempt {} to {} failed: {}",
                    attempt,
                    config.url,
                    e
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_interval) => {}
        }
    }
    tracing::debug!("[Transport] Connection loop for {} stopped", config.url);
}

async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: &WebSocketConfig,
    mut recorder: Option<&mut FrameRecorder>,
    tx: &mpsc::Sender<TransportMessage>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();
    let mut keepalive = interval_at(
        Instant::now() + config.keepalive_interval,
        config.keepalive_interval,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut unanswered: u32 = 0;
    let mut stale_reported = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.close().await;
                return SessionEnd::Cancelled;
            }
            _ = keepalive.tick() => {
                if unanswered >= config.stale_after_missed && !stale_reported {
                    tracing::warn!(
                        "[Transport] {} keep-alives unanswered, connection stale",
                        unanswered
                    );
                    stale_reported = true;
                    if tx.send(TransportMessage::Connection(ConnectionSignal::Stale)).await.is_err() {
                        return SessionEnd::ReceiverGone;
                    }
                }
                if let Err(e) = write.send(Message::Text(KEEPALIVE_PING.to_string())).await {
                    tracing::warn!("[Transport] Keep-alive send failed: {}", e);
                    return SessionEnd::Disconnected;
                }
                unanswered += 1;
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(recorder) = recorder.as_deref_mut() {
                            if let Err(e) = recorder.record(&text).await {
                                tracing::warn!("[Transport] Failed to record frame: {}", e);
                            }
                        }
                        let Some(message) = parse_frame(&text) else {
                            continue;
                        };
                        if message == TransportMessage::Connection(ConnectionSignal::Heartbeat) {
                            unanswered = 0;
                            stale_reported = false;
                        }
                        if tx.send(message).await.is_err() {
                            return SessionEnd::ReceiverGone;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("[Transport] Server closed the connection: {:?}", frame);
                        return SessionEnd::Disconnected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("[Transport] Read error: {}", e);
                        return SessionEnd::Disconnected;
                    }
                    None => return SessionEnd::Disconnected,
                }
            }
        }
    }
}
