//! Event Log
//!
//! Append-only, bounded, single-case sequence of activity events. Arrival
//! order is the only order the engines ever see; entries are never re-sorted
//! by timestamp.

use std::collections::VecDeque;

use case_review_core::{ActivityEvent, Stage};
use serde::{Deserialize, Serialize};

/// Default number of entries retained per case.
pub const DEFAULT_CAPACITY: usize = 100;

/// An event plus its arrival sequence number within the current case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub seq: u64,
    pub event: ActivityEvent,
}

/// Outcome of offering an event to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored under the given sequence number.
    Appended { seq: u64, evicted: bool },
    /// Belongs to a case other than the one being observed.
    ForeignCase,
    /// No case is being observed.
    Detached,
}

/// Bounded per-case event log.
#[derive(Debug, Clone)]
pub struct EventLog {
    case_id: Option<String>,
    entries: VecDeque<LoggedEvent>,
    capacity: usize,
    next_seq: u64,
    dropped: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            case_id: None,
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
            dropped: 0,
        }
    }

    /// Case currently being observed.
    pub fn case_id(&self) -> Option<&str> {
        self.case_id.as_deref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Scope the log to `case_id`. Switching to a different case clears it;
    /// re-attaching to the same case keeps what was collected.
    pub fn attach(&mut self, case_id: impl Into<String>) {
        let case_id = case_id.into();
        if self.case_id.as_deref() == Some(case_id.as_str()) {
            return;
        }
        self.clear();
        self.case_id = Some(case_id);
    }

    /// Stop observing any case and drop every entry.
    pub fn detach(&mut self) {
        self.clear();
        self.case_id = None;
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
        self.dropped = 0;
    }

    /// Append an event for the observed case, evicting the oldest entry when
    /// the log is full.
    pub fn append(&mut self, event: ActivityEvent) -> AppendOutcome {
        let Some(case_id) = self.case_id.as_deref() else {
            return AppendOutcome::Detached;
        };
        if event.case_id != case_id {
            return AppendOutcome::ForeignCase;
        }

        let mut evicted = false;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
            evicted = true;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(LoggedEvent { seq, event });
        AppendOutcome::Appended { seq, evicted }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries evicted since the case was attached.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter()
    }

    /// Events in arrival order.
    pub fn events(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Events produced by the agent driving `stage`, in arrival order.
    pub fn stage_events(&self, stage: Stage) -> impl Iterator<Item = &ActivityEvent> {
        self.events().filter(move |e| e.stage() == Some(stage))
    }

    /// The most recently appended entry.
    pub fn latest(&self) -> Option<&LoggedEvent> {
        self.entries.back()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
