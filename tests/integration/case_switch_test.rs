//! Case Switching Integration Tests
//!
//! Switching the observed case must detach the old stream and drop every
//! pending timer before the new case is attached.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use case_review_core::{ActivityEvent, ActivityStatus, Agent};
use case_review_monitor::models::settings::MonitorConfig;
use case_review_monitor::services::history::StaticHistory;
use case_review_monitor::services::monitor::CaseMonitor;
use case_review_monitor::services::transport::{
    ConnectionSignal, EventTransport, Subscription, TransportError, TransportMessage,
};
use case_review_pacing::{CloseReason, DelayGenerator, FixedDelay, PacingConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Connects, then stays silent. Keeps every subscription's token.
#[derive(Default)]
struct QuietTransport {
    tokens: Mutex<Vec<CancellationToken>>,
}

impl QuietTransport {
    fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTransport for QuietTransport {
    fn name(&self) -> &'static str {
        "quiet"
    }

    async fn subscribe(
        &self,
        sender: mpsc::Sender<TransportMessage>,
    ) -> Result<Subscription, TransportError> {
        let cancel = CancellationToken::new();
        self.tokens.lock().unwrap().push(cancel.clone());
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let _ = sender
                .send(TransportMessage::Connection(ConnectionSignal::Connected))
                .await;
            token.cancelled().await;
        });
        Ok(Subscription::new(cancel, handle))
    }
}

fn monitor(transport: Arc<QuietTransport>) -> CaseMonitor {
    CaseMonitor::new(MonitorConfig::default(), transport).with_delays(
        |_: &PacingConfig| -> Box<dyn DelayGenerator> {
            Box::new(FixedDelay::of(Duration::from_millis(400)))
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_switch_cancels_previous_timers_and_stream() {
    let transport = Arc::new(QuietTransport::default());
    let mut handle = monitor(transport.clone()).spawn();

    handle.watch("case-a").await.unwrap();
    handle
        .views()
        .wait_for(|view| view.as_ref().is_some_and(|v| v.case_id == "case-a"))
        .await
        .unwrap();

    // Part way into case-a's narrative, with its hard timeout still armed.
    tokio::time::sleep(Duration::from_secs(12)).await;
    handle.watch("case-b").await.unwrap();

    let view = handle.wait_for_close("case-b").await.unwrap();

    // case-a's hard timeout would have closed case-b 18 s in.
    assert_eq!(view.closed, Some(CloseReason::TimedOut));
    assert_eq!(view.elapsed_seconds, 30);
    assert_eq!(handle.current().unwrap().case_id, "case-b");

    let tokens = transport.tokens();
    assert_eq!(tokens.len(), 2);
    assert!(tokens[0].is_cancelled());
    assert!(!tokens[1].is_cancelled());

    handle.shutdown().await;
    assert!(transport.tokens()[1].is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_switch_discards_previous_case_state() {
    let history = StaticHistory::new(vec![
        ActivityEvent::new(
            "case-a",
            Agent::DocumentInspector,
            "Extraction Complete",
            ActivityStatus::Success,
        ),
        ActivityEvent::new(
            "case-b",
            Agent::DocumentInspector,
            "Extracting Data",
            ActivityStatus::InProgress,
        ),
    ]);
    let transport = Arc::new(QuietTransport::default());
    let handle = monitor(transport).with_history(Arc::new(history)).spawn();

    handle.watch("case-a").await.unwrap();
    let mut views = handle.views();
    let first = views
        .wait_for(|view| view.as_ref().is_some_and(|v| v.case_id == "case-a"))
        .await
        .unwrap()
        .clone()
        .unwrap();
    assert_eq!(first.event_count, 1);

    handle.watch("case-b").await.unwrap();
    let second = views
        .wait_for(|view| view.as_ref().is_some_and(|v| v.case_id == "case-b"))
        .await
        .unwrap()
        .clone()
        .unwrap();

    assert_eq!(second.event_count, 1);
    assert_ne!(first.session_id, second.session_id);
    assert!(second.narrative_visible);
    assert!(second.closed.is_none());

    handle.shutdown().await;
}
