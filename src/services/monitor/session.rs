//! Case Session
//!
//! Everything the monitor knows about the one case it is observing: the
//! reconciler, the pacing scheduler and the connection indicator. A session
//! is synchronous; the runner feeds it messages and timers one at a time
//! and applies the effects it returns.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use case_review_core::{ActivityEvent, ActivityStatus, Agent};
use case_review_pacing::{PacingEffect, PacingScheduler, TimerId};
use case_review_reconcile::{AppendOutcome, ProgressSnapshot, Reconciler};
use uuid::Uuid;

use crate::services::presentation::{project, ConnectionState, MonitorView};
use crate::services::transport::TransportMessage;

type EventIdentity = (String, Agent, String, ActivityStatus);

/// Identities of the most recent events, bounded like the event log.
#[derive(Debug)]
struct SeenEvents {
    capacity: usize,
    order: VecDeque<EventIdentity>,
    index: HashSet<EventIdentity>,
}

impl SeenEvents {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    /// Record `identity`; `false` if it is already remembered.
    fn insert(&mut self, identity: EventIdentity) -> bool {
        if self.index.contains(&identity) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.index.remove(&oldest);
            }
        }
        self.index.insert(identity.clone());
        self.order.push_back(identity);
        true
    }
}

/// Result of handling one transport message.
#[derive(Debug, Default)]
pub struct SessionUpdate {
    pub effects: Vec<PacingEffect>,
    /// The projected view may have changed.
    pub changed: bool,
}

#[derive(Debug)]
pub struct CaseSession {
    id: String,
    case_id: String,
    reconciler: Reconciler,
    pacing: PacingScheduler,
    connection: ConnectionState,
    seen: SeenEvents,
    duplicates: u64,
}

impl CaseSession {
    pub fn new(case_id: impl Into<String>, capacity: usize, pacing: PacingScheduler) -> Self {
        let case_id = case_id.into();
        let mut reconciler = Reconciler::new(capacity);
        reconciler.attach(case_id.clone());
        Self {
            id: Uuid::new_v4().to_string(),
            case_id,
            reconciler,
            pacing,
            connection: ConnectionState::default(),
            seen: SeenEvents::new(capacity),
            duplicates: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn pacing(&self) -> &PacingScheduler {
        &self.pacing
    }

    pub fn is_closed(&self) -> bool {
        self.pacing.is_closed()
    }

    /// Live or hydrated entries skipped because they were already seen.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Accept an event once. Returns whether it reached the engines.
    fn accept(&mut self, event: ActivityEvent) -> bool {
        if event.case_id != self.case_id {
            return false;
        }
        if !self.seen.insert(event.identity()) {
            self.duplicates += 1;
            tracing::trace!(
                "[Monitor] Skipping duplicate '{}' from {}",
                event.action,
                event.agent.as_str()
            );
            return false;
        }
        matches!(self.reconciler.ingest(event), AppendOutcome::Appended { .. })
    }

    /// Seed the log with previously emitted events, in producer order.
    /// Returns how many were accepted.
    pub fn hydrate(&mut self, events: Vec<ActivityEvent>) -> usize {
        let mut accepted = 0;
        for event in events {
            if self.accept(event) {
                accepted += 1;
            }
        }
        if accepted > 0 {
            tracing::info!(
                "[Monitor] Hydrated case {} with {} events",
                self.case_id,
                accepted
            );
        }
        accepted
    }

    /// Start pacing. Hydrated progress is observed straight away.
    pub fn start(&mut self, now: Instant) -> Vec<PacingEffect> {
        let mut effects = self.pacing.start(now);
        let progress = self.reconciler.snapshot();
        effects.extend(self.pacing.observe(&progress, now));
        effects
    }

    pub fn handle(&mut self, message: TransportMessage, now: Instant) -> SessionUpdate {
        match message {
            TransportMessage::Event(event) => {
                if !self.accept(event) {
                    return SessionUpdate::default();
                }
                let progress = self.reconciler.snapshot();
                SessionUpdate {
                    effects: self.pacing.observe(&progress, now),
                    changed: true,
                }
            }
            TransportMessage::Connection(signal) => {
                let next = self.connection.apply(signal);
                let changed = next != self.connection;
                if changed {
                    tracing::info!(
                        "[Monitor] Connection for case {} is {}",
                        self.case_id,
                        next.label()
                    );
                }
                self.connection = next;
                SessionUpdate {
                    effects: Vec::new(),
                    changed,
                }
            }
            TransportMessage::Notice(notice) => {
                if notice.concerns(&self.case_id) {
                    tracing::info!(
                        "[Monitor] {:?} for case {}: {}",
                        notice.kind,
                        self.case_id,
                        notice.summary
                    );
                }
                SessionUpdate::default()
            }
        }
    }

    pub fn on_timer(&mut self, id: TimerId, now: Instant) -> Vec<PacingEffect> {
        self.pacing.on_timer(id, now)
    }

    /// Stop pacing. Any timer still in flight for this session becomes stale.
    pub fn cancel(&mut self) -> Vec<PacingEffect> {
        self.pacing.cancel()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.reconciler.snapshot()
    }

    pub fn view(&self, now: Instant) -> MonitorView {
        project(
            &self.id,
            &self.case_id,
            &self.reconciler.snapshot(),
            &self.pacing,
            self.connection,
            now,
        )
    }
}
