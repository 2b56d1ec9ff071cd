//! Timer Queue
//!
//! Async side of the scheduler: holds the armed `TimerId`s in a
//! `DelayQueue` and yields them back as they expire.

use std::future::poll_fn;
use std::time::Duration;

use tokio_util::time::DelayQueue;

use crate::scheduler::{PacingEffect, TimerId};

#[derive(Debug, Default)]
pub struct TimerQueue {
    queue: DelayQueue<TimerId>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.queue.insert(id, delay);
    }

    /// Arm every `ScheduleTimer` effect in `effects`.
    pub fn apply(&mut self, effects: &[PacingEffect]) {
        for effect in effects {
            if let PacingEffect::ScheduleTimer { id, delay } = effect {
                self.schedule(*id, *delay);
            }
        }
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Wait for the next timer to expire. Never resolves while the queue is
    /// empty, so it can sit in a `select!` loop. Cancel safe.
    pub async fn next_expired(&mut self) -> TimerId {
        loop {
            if self.queue.is_empty() {
                std::future::pending::<()>().await;
            }
            if let Some(expired) = poll_fn(|cx| self.queue.poll_expired(cx)).await {
                return expired.into_inner();
            }
        }
    }
}
