//! Monitor Runtime
//!
//! Single logical thread that owns the observed case. One `select!` loop
//! serializes commands, transport messages and expired pacing timers, so
//! the session is only ever touched by one of them at a time.

use std::sync::Arc;
use std::time::Instant;

use case_review_pacing::{
    DelayGenerator, PacingConfig, PacingEffect, PacingScheduler, RandomDelay, TimerQueue,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::session::CaseSession;
use crate::models::settings::MonitorConfig;
use crate::services::history::HistorySource;
use crate::services::presentation::MonitorView;
use crate::services::transport::{EventTransport, Subscription, TransportMessage};
use crate::utils::error::{AppError, AppResult};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Builds the delay source for each new pacing session.
pub type DelayFactory = Arc<dyn Fn(&PacingConfig) -> Box<dyn DelayGenerator> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCommand {
    /// Observe a case, replacing whatever was observed before.
    Watch { case_id: String },
    /// Stop observing without shutting down.
    Stop,
    Shutdown,
}

/// How an attach attempt ended.
enum Attach {
    Ready,
    /// A command arrived while history was loading; the attach was abandoned.
    Interrupted(Option<MonitorCommand>),
    Cancelled,
}

/// Monitor configuration plus its collaborators.
pub struct CaseMonitor {
    config: MonitorConfig,
    transport: Arc<dyn EventTransport>,
    history: Option<Arc<dyn HistorySource>>,
    delays: DelayFactory,
}

impl CaseMonitor {
    pub fn new(config: MonitorConfig, transport: Arc<dyn EventTransport>) -> Self {
        Self {
            config,
            transport,
            history: None,
            delays: Arc::new(|pacing: &PacingConfig| -> Box<dyn DelayGenerator> {
                Box::new(RandomDelay::new(pacing.jitter_ratio))
            }),
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistorySource>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_delays<F>(mut self, factory: F) -> Self
    where
        F: Fn(&PacingConfig) -> Box<dyn DelayGenerator> + Send + Sync + 'static,
    {
        self.delays = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start the runtime on the current tokio runtime.
    pub fn spawn(self) -> MonitorHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (views_tx, views_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        tracing::info!(
            "[Monitor] Starting with {} transport",
            self.transport.name()
        );
        let runtime = MonitorRuntime {
            monitor: self,
            session: None,
            subscription: None,
            events_rx: None,
            timers: TimerQueue::new(),
            views: views_tx,
        };
        let task = tokio::spawn(runtime.run(commands_rx, cancel.clone()));

        MonitorHandle {
            commands: commands_tx,
            views: views_rx,
            cancel,
            task,
        }
    }

    /// Observe one case until its narrative closes and return the final view.
    pub async fn run_to_close(self, case_id: impl Into<String>) -> AppResult<MonitorView> {
        let case_id = case_id.into();
        let mut handle = self.spawn();
        handle.watch(case_id.clone()).await?;
        let result = handle.wait_for_close(&case_id).await;
        handle.shutdown().await;
        result
    }
}

/// Handle to a running monitor.
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    views: watch::Receiver<Option<MonitorView>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    async fn send(&self, command: MonitorCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::internal("monitor is no longer running"))
    }

    pub async fn watch(&self, case_id: impl Into<String>) -> AppResult<()> {
        self.send(MonitorCommand::Watch {
            case_id: case_id.into(),
        })
        .await
    }

    pub async fn stop(&self) -> AppResult<()> {
        self.send(MonitorCommand::Stop).await
    }

    /// Subscribe to view updates.
    pub fn views(&self) -> watch::Receiver<Option<MonitorView>> {
        self.views.clone()
    }

    pub fn current(&self) -> Option<MonitorView> {
        self.views.borrow().clone()
    }

    /// Wait for the first published view of `case_id` matching `done`.
    pub async fn wait_until<F>(&mut self, case_id: &str, mut done: F) -> AppResult<MonitorView>
    where
        F: FnMut(&MonitorView) -> bool,
    {
        loop {
            if let Some(view) = self
                .views
                .borrow_and_update()
                .as_ref()
                .filter(|view| view.case_id == case_id && done(view))
            {
                return Ok(view.clone());
            }
            self.views
                .changed()
                .await
                .map_err(|_| AppError::internal("monitor stopped before the view settled"))?;
        }
    }

    /// Wait until the narrative for `case_id` has closed.
    pub async fn wait_for_close(&mut self, case_id: &str) -> AppResult<MonitorView> {
        self.wait_until(case_id, |view| view.closed.is_some()).await
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(MonitorCommand::Shutdown).await;
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("[Monitor] Runtime task ended abnormally: {}", e);
        }
    }
}

/// Clock shared with the timer queue, so paused test time applies to both.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn recv_message(
    rx: &mut Option<mpsc::Receiver<TransportMessage>>,
) -> Option<TransportMessage> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

struct MonitorRuntime {
    monitor: CaseMonitor,
    session: Option<CaseSession>,
    subscription: Option<Subscription>,
    events_rx: Option<mpsc::Receiver<TransportMessage>>,
    timers: TimerQueue,
    views: watch::Sender<Option<MonitorView>>,
}

impl MonitorRuntime {
    async fn run(mut self, mut commands: mpsc::Receiver<MonitorCommand>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => {
                    if !self.execute(command, &mut commands, &cancel).await {
                        break;
                    }
                }
                message = recv_message(&mut self.events_rx) => match message {
                    Some(message) => self.on_message(message),
                    None => {
                        tracing::debug!("[Monitor] Transport stream ended");
                        self.events_rx = None;
                    }
                },
                id = self.timers.next_expired() => {
                    let Some(session) = self.session.as_mut() else {
                        continue;
                    };
                    let effects = session.on_timer(id, now());
                    if !effects.is_empty() {
                        self.apply(effects);
                        self.publish();
                    }
                }
            }
        }
        self.detach();
        tracing::info!("[Monitor] Stopped");
    }

    /// Run a command and any command that interrupts it. Returns `false`
    /// when the runtime should stop.
    async fn execute(
        &mut self,
        mut command: Option<MonitorCommand>,
        commands: &mut mpsc::Receiver<MonitorCommand>,
        cancel: &CancellationToken,
    ) -> bool {
        loop {
            match command {
                Some(MonitorCommand::Watch { case_id }) => {
                    match self.switch_to(case_id, commands, cancel).await {
                        Attach::Ready => return true,
                        Attach::Interrupted(next) => command = next,
                        Attach::Cancelled => return false,
                    }
                }
                Some(MonitorCommand::Stop) => {
                    self.detach();
                    self.views.send_replace(None);
                    return true;
                }
                Some(MonitorCommand::Shutdown) | None => return false,
            }
        }
    }

    /// Tear down the current case: cancel pacing, clear every pending timer
    /// and drop the subscription before anything new is attached.
    fn detach(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cancel();
            tracing::info!(
                "[Monitor] Stopped watching case {} (session {})",
                session.case_id(),
                session.id()
            );
        }
        self.timers.clear();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.events_rx = None;
    }

    async fn switch_to(
        &mut self,
        case_id: String,
        commands: &mut mpsc::Receiver<MonitorCommand>,
        cancel: &CancellationToken,
    ) -> Attach {
        self.detach();

        let config = &self.monitor.config;
        let scheduler = PacingScheduler::with_delays(
            config.pacing.clone(),
            config.narrative.clone(),
            (self.monitor.delays)(&config.pacing),
        );
        let mut session = CaseSession::new(case_id.clone(), config.event_log_capacity, scheduler);
        tracing::info!(
            "[Monitor] Watching case {} (session {})",
            case_id,
            session.id()
        );

        // Subscribe first so nothing emitted during the history fetch is lost;
        // overlap is removed by the session's duplicate check.
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        match self.monitor.transport.subscribe(tx).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.events_rx = Some(rx);
            }
            Err(e) => {
                tracing::warn!(
                    "[Monitor] Failed to subscribe via {}: {}",
                    self.monitor.transport.name(),
                    e
                );
            }
        }

        let history = self
            .monitor
            .history
            .clone()
            .filter(|_| config.history_backfill);
        if let Some(history) = history {
            // Commands and shutdown are still serviced while history loads.
            let fetched = tokio::select! {
                _ = cancel.cancelled() => return Attach::Cancelled,
                command = commands.recv() => {
                    tracing::info!(
                        "[Monitor] Abandoning history fetch for case {}",
                        case_id
                    );
                    return Attach::Interrupted(command);
                }
                fetched = history.fetch(&case_id) => fetched,
            };
            match fetched {
                Ok(events) => {
                    session.hydrate(events);
                }
                Err(e) => {
                    tracing::warn!(
                        "[Monitor] History for case {} unavailable, continuing live only: {}",
                        case_id,
                        e
                    );
                }
            }
        }

        let effects = session.start(now());
        self.session = Some(session);
        self.apply(effects);
        self.publish();
        Attach::Ready
    }

    fn on_message(&mut self, message: TransportMessage) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let update = session.handle(message, now());
        let changed = update.changed || !update.effects.is_empty();
        self.apply(update.effects);
        if changed {
            self.publish();
        }
    }

    fn apply(&mut self, effects: Vec<PacingEffect>) {
        for effect in effects {
            match effect {
                PacingEffect::ScheduleTimer { id, delay } => self.timers.schedule(id, delay),
                PacingEffect::Announce { stage, message } => {
                    tracing::debug!("[Monitor] {}: {}", stage, message);
                }
                PacingEffect::StageNarrated { stage } => {
                    tracing::debug!("[Monitor] Narration of {} finished", stage);
                }
                PacingEffect::Teardown { reason } => {
                    self.timers.clear();
                    if let Some(session) = &self.session {
                        tracing::info!(
                            "[Monitor] Narrative for case {} closed: {}",
                            session.case_id(),
                            reason
                        );
                    }
                }
            }
        }
    }

    fn publish(&self) {
        let view = self.session.as_ref().map(|session| session.view(now()));
        self.views.send_replace(view);
    }
}
