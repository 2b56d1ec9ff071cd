//! Display Pacing Scheduler
//!
//! Pure state machine that slows the presentation of a case down to a pace a
//! reviewer can follow. It never reads the clock and never sleeps: callers
//! pass the current `Instant` in, and the scheduler answers with
//! `PacingEffect`s (timers to arm, messages to show, teardown).
//!
//! Per narrated stage the flow is announce, wait, advance. Around that sit
//! the session phases:
//!
//! ```text
//! Idle -> LeadIn -> Waiting(stage, i) ... -> AwaitingCompletion(stage)
//!      -> (next stage) ... -> Lingering -> Closed(Completed)
//! any visible phase --hard timeout, no terminal signal--> Closed(TimedOut)
//! any phase --cancel--> Closed(Cancelled)
//! ```
//!
//! Timers are identified by `TimerId`, which carries the scheduler
//! generation. Cancelling or closing bumps the generation, so a timer that
//! fires late is recognised as stale and ignored.

use std::time::{Duration, Instant};

use case_review_core::{Stage, StageState, StageStatus};
use case_review_reconcile::{ProgressSnapshot, StageDerivation};
use serde::{Deserialize, Serialize};

use crate::config::PacingConfig;
use crate::delay::{DelayGenerator, RandomDelay};
use crate::script::NarrativeScripts;

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    LeadIn,
    Advance,
    MinimumVisible,
    HardTimeout,
}

/// Identity of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub generation: u64,
    pub seq: u64,
    pub kind: TimerKind,
}

/// Why a pacing session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The final stage was narrated and the minimum-visible window elapsed.
    Completed,
    /// The hard fallback timer fired. Callers treat this as unresolved.
    TimedOut,
    /// The session was switched away from or torn down.
    Cancelled,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Completed => write!(f, "completed"),
            CloseReason::TimedOut => write!(f, "timed_out"),
            CloseReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPhase {
    /// No session started.
    Idle,
    LeadIn,
    /// Message `message_index` of `stage` is shown; its advance timer is armed.
    Waiting { stage: Stage, message_index: usize },
    /// Script exhausted; waiting for the stage's real status to turn terminal.
    AwaitingCompletion { stage: Stage },
    /// Final view held until the minimum-visible deadline.
    Lingering,
    Closed(CloseReason),
}

impl PacingPhase {
    /// The stage currently being narrated, if any.
    pub fn narrated_stage(&self) -> Option<Stage> {
        match self {
            PacingPhase::Waiting { stage, .. } | PacingPhase::AwaitingCompletion { stage } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}

/// Instructions for the async shell.
#[derive(Debug, Clone, PartialEq)]
pub enum PacingEffect {
    ScheduleTimer { id: TimerId, delay: Duration },
    Announce { stage: Stage, message: String },
    StageNarrated { stage: Stage },
    Teardown { reason: CloseReason },
}

/// The scripted message on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    pub stage: Stage,
    pub message: String,
    pub index: usize,
    pub total: usize,
}

/// Point-in-time view of the scheduler's clocks.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingState {
    pub phase: PacingPhase,
    pub session_start: Option<Instant>,
    pub elapsed: Duration,
    pub step_elapsed: Duration,
    pub minimum_display_deadline: Option<Instant>,
    pub hard_timeout_deadline: Option<Instant>,
    pub visible: bool,
}

pub struct PacingScheduler {
    config: PacingConfig,
    scripts: NarrativeScripts,
    delays: Box<dyn DelayGenerator>,
    phase: PacingPhase,
    generation: u64,
    next_seq: u64,
    armed: Vec<TimerId>,
    session_start: Option<Instant>,
    step_started: Option<Instant>,
    hard_deadline: Option<Instant>,
    terminal_seen_at: Option<Instant>,
    linger_deadline: Option<Instant>,
    real: [StageStatus; 4],
    narration: Option<Narration>,
}

impl std::fmt::Debug for PacingScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacingScheduler")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("armed", &self.armed.len())
            .finish()
    }
}

impl PacingScheduler {
    pub fn new(
        config: PacingConfig,
        scripts: NarrativeScripts,
        delays: impl DelayGenerator + 'static,
    ) -> Self {
        Self::with_delays(config, scripts, Box::new(delays))
    }

    /// Like `new`, for callers that pick the delay source at runtime.
    pub fn with_delays(
        config: PacingConfig,
        scripts: NarrativeScripts,
        delays: Box<dyn DelayGenerator>,
    ) -> Self {
        Self {
            config,
            scripts,
            delays,
            phase: PacingPhase::Idle,
            generation: 0,
            next_seq: 0,
            armed: Vec::new(),
            session_start: None,
            step_started: None,
            hard_deadline: None,
            terminal_seen_at: None,
            linger_deadline: None,
            real: [StageStatus::Pending; 4],
            narration: None,
        }
    }

    /// Scheduler with default scripts and jittered random delays.
    pub fn from_config(config: PacingConfig) -> Self {
        let delays = RandomDelay::new(config.jitter_ratio);
        Self::new(config, NarrativeScripts::default(), delays)
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    pub fn phase(&self) -> PacingPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn narration(&self) -> Option<&Narration> {
        self.narration.as_ref()
    }

    /// The narrative overlay is on screen.
    pub fn is_visible(&self) -> bool {
        matches!(
            self.phase,
            PacingPhase::LeadIn
                | PacingPhase::Waiting { .. }
                | PacingPhase::AwaitingCompletion { .. }
                | PacingPhase::Lingering
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, PacingPhase::Closed(_))
    }

    /// Begin a new session. Any previous session's timers become stale.
    pub fn start(&mut self, now: Instant) -> Vec<PacingEffect> {
        self.invalidate_timers();
        self.session_start = Some(now);
        self.step_started = Some(now);
        self.hard_deadline = Some(now + self.config.hard_timeout());
        self.terminal_seen_at = None;
        self.linger_deadline = None;
        self.real = [StageStatus::Pending; 4];
        self.narration = None;
        self.phase = PacingPhase::LeadIn;

        tracing::debug!(
            "[Pacing] Session started (generation {}, hard timeout {:?})",
            self.generation,
            self.config.hard_timeout()
        );

        let mut effects = Vec::new();
        self.arm(TimerKind::HardTimeout, self.config.hard_timeout(), &mut effects);
        self.arm(TimerKind::LeadIn, self.config.lead_in(), &mut effects);
        effects
    }

    /// Feed the latest reconciled progress.
    pub fn observe(&mut self, progress: &ProgressSnapshot, now: Instant) -> Vec<PacingEffect> {
        for state in &progress.derivation.stages {
            self.real[state.stage.index()] = state.status;
        }
        if progress.has_terminal_signal() && self.terminal_seen_at.is_none() {
            tracing::debug!("[Pacing] Terminal signal observed, hard timeout disarmed");
            self.terminal_seen_at = Some(now);
            self.disarm(TimerKind::HardTimeout);
            self.hard_deadline = None;
        }

        let mut effects = Vec::new();
        if matches!(self.phase, PacingPhase::AwaitingCompletion { .. }) {
            self.try_finish_stage(now, &mut effects);
        }
        effects
    }

    /// Handle an expired timer. Stale or unknown ids produce no effects.
    pub fn on_timer(&mut self, id: TimerId, now: Instant) -> Vec<PacingEffect> {
        let mut effects = Vec::new();
        if id.generation != self.generation {
            tracing::trace!("[Pacing] Ignoring timer from generation {}", id.generation);
            return effects;
        }
        let Some(pos) = self.armed.iter().position(|armed| *armed == id) else {
            return effects;
        };
        self.armed.swap_remove(pos);

        match id.kind {
            TimerKind::HardTimeout => {
                tracing::warn!(
                    "[Pacing] Hard timeout after {:?}, closing unresolved",
                    self.config.hard_timeout()
                );
                self.close(CloseReason::TimedOut, &mut effects);
            }
            TimerKind::LeadIn => {
                if self.phase == PacingPhase::LeadIn {
                    self.enter_stage(Stage::DocumentInspection, now, &mut effects);
                }
            }
            TimerKind::Advance => self.advance(now, &mut effects),
            TimerKind::MinimumVisible => self.close(CloseReason::Completed, &mut effects),
        }
        effects
    }

    /// Cancel every pending timer. The caller must also clear its timer queue.
    pub fn cancel(&mut self) -> Vec<PacingEffect> {
        let mut effects = Vec::new();
        if self.is_visible() {
            self.close(CloseReason::Cancelled, &mut effects);
        } else {
            self.invalidate_timers();
            if self.phase == PacingPhase::Idle {
                self.phase = PacingPhase::Closed(CloseReason::Cancelled);
            }
        }
        effects
    }

    /// Apply display gating to the real derivation.
    ///
    /// While the narrative is visible, stages before the narrated one show
    /// their real status, the narrated stage shows `active` with the scripted
    /// message, and later stages show `pending`. Otherwise the real state is
    /// returned unmodified.
    pub fn gate(&self, derivation: &StageDerivation) -> Vec<StageState> {
        let (cutoff, narration) = match self.phase {
            PacingPhase::LeadIn => (Stage::DocumentInspection.index(), None),
            PacingPhase::Waiting { stage, .. } | PacingPhase::AwaitingCompletion { stage } => {
                (stage.index(), self.narration.as_ref())
            }
            _ => return derivation.stages.clone(),
        };

        derivation
            .stages
            .iter()
            .map(|state| {
                let index = state.stage.index();
                if index < cutoff {
                    state.clone()
                } else if index == cutoff && narration.is_some() {
                    let mut shown = StageState::new(state.stage, StageStatus::Active);
                    shown.details = narration.map(|n| n.message.clone());
                    shown
                } else {
                    StageState::new(state.stage, StageStatus::Pending)
                }
            })
            .collect()
    }

    pub fn state(&self, now: Instant) -> PacingState {
        let since = |start: Option<Instant>| {
            start
                .map(|s| now.saturating_duration_since(s))
                .unwrap_or_default()
        };
        PacingState {
            phase: self.phase,
            session_start: self.session_start,
            elapsed: since(self.session_start),
            step_elapsed: since(self.step_started),
            minimum_display_deadline: self.linger_deadline,
            hard_timeout_deadline: self.hard_deadline,
            visible: self.is_visible(),
        }
    }

    fn arm(&mut self, kind: TimerKind, delay: Duration, effects: &mut Vec<PacingEffect>) {
        let id = TimerId {
            generation: self.generation,
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        self.armed.push(id);
        effects.push(PacingEffect::ScheduleTimer { id, delay });
    }

    fn disarm(&mut self, kind: TimerKind) {
        self.armed.retain(|id| id.kind != kind);
    }

    fn invalidate_timers(&mut self) {
        self.generation += 1;
        self.armed.clear();
    }

    fn enter_stage(&mut self, stage: Stage, now: Instant, effects: &mut Vec<PacingEffect>) {
        tracing::debug!("[Pacing] Narrating {}", stage);
        self.step_started = Some(now);
        if self.scripts.len(stage) == 0 {
            self.narration = None;
            self.phase = PacingPhase::AwaitingCompletion { stage };
            self.try_finish_stage(now, effects);
            return;
        }
        self.announce(stage, 0, effects);
    }

    fn announce(&mut self, stage: Stage, index: usize, effects: &mut Vec<PacingEffect>) {
        let total = self.scripts.len(stage);
        let message = self
            .scripts
            .message(stage, index)
            .unwrap_or_default()
            .to_string();

        self.narration = Some(Narration {
            stage,
            message: message.clone(),
            index,
            total,
        });
        self.phase = PacingPhase::Waiting {
            stage,
            message_index: index,
        };
        effects.push(PacingEffect::Announce { stage, message });

        let delay = self.delays.next_delay(stage, self.config.base_window(stage));
        self.arm(TimerKind::Advance, delay, effects);
    }

    fn advance(&mut self, now: Instant, effects: &mut Vec<PacingEffect>) {
        let PacingPhase::Waiting {
            stage,
            message_index,
        } = self.phase
        else {
            return;
        };

        let next = message_index + 1;
        self.step_started = Some(now);
        if next < self.scripts.len(stage) {
            self.announce(stage, next, effects);
        } else {
            self.phase = PacingPhase::AwaitingCompletion { stage };
            self.try_finish_stage(now, effects);
        }
    }

    fn try_finish_stage(&mut self, now: Instant, effects: &mut Vec<PacingEffect>) {
        let PacingPhase::AwaitingCompletion { stage } = self.phase else {
            return;
        };

        if self.real[stage.index()].is_terminal() {
            effects.push(PacingEffect::StageNarrated { stage });
            match stage.next() {
                Some(next) => self.enter_stage(next, now, effects),
                None => self.linger(now, effects),
            }
        } else if self.terminal_seen_at.is_some() {
            tracing::info!(
                "[Pacing] Pipeline finished while {} is still open, ending narrative",
                stage
            );
            self.linger(now, effects);
        }
    }

    fn linger(&mut self, now: Instant, effects: &mut Vec<PacingEffect>) {
        let seen = self.terminal_seen_at.unwrap_or(now);
        let deadline = seen + self.config.minimum_visible();
        self.linger_deadline = Some(deadline);
        self.narration = None;
        self.phase = PacingPhase::Lingering;
        self.arm(
            TimerKind::MinimumVisible,
            deadline.saturating_duration_since(now),
            effects,
        );
    }

    fn close(&mut self, reason: CloseReason, effects: &mut Vec<PacingEffect>) {
        if self.is_closed() {
            return;
        }
        self.invalidate_timers();
        self.narration = None;
        self.phase = PacingPhase::Closed(reason);
        tracing::info!("[Pacing] Session closed: {}", reason);
        effects.push(PacingEffect::Teardown { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::FixedDelay;
    use case_review_core::{ActivityEvent, ActivityStatus, Agent, Decision, EventData, RiskLevel};
    use case_review_reconcile::Reconciler;

    const CASE: &str = "case-1";

    /// Drives a scheduler against a simulated clock.
    struct Harness {
        scheduler: PacingScheduler,
        clock: Instant,
        pending: Vec<(Instant, TimerId)>,
        announced: Vec<(Stage, String)>,
        narrated: Vec<Stage>,
        teardown: Option<CloseReason>,
    }

    impl Harness {
        fn new(scripts: NarrativeScripts) -> Self {
            let scheduler = PacingScheduler::new(
                PacingConfig::default(),
                scripts,
                FixedDelay::of(Duration::from_millis(1_000)),
            );
            Self {
                scheduler,
                clock: Instant::now(),
                pending: Vec::new(),
                announced: Vec::new(),
                narrated: Vec::new(),
                teardown: None,
            }
        }

        fn apply(&mut self, effects: Vec<PacingEffect>) {
            for effect in effects {
                match effect {
                    PacingEffect::ScheduleTimer { id, delay } => {
                        self.pending.push((self.clock + delay, id))
                    }
                    PacingEffect::Announce { stage, message } => {
                        self.announced.push((stage, message))
                    }
                    PacingEffect::StageNarrated { stage } => self.narrated.push(stage),
                    PacingEffect::Teardown { reason } => self.teardown = Some(reason),
                }
            }
        }

        fn start(&mut self) {
            let effects = self.scheduler.start(self.clock);
            self.apply(effects);
        }

        fn observe(&mut self, progress: &ProgressSnapshot) {
            let effects = self.scheduler.observe(progress, self.clock);
            self.apply(effects);
        }

        /// Fire the earliest pending timer, advancing the clock to it.
        fn fire_next(&mut self) -> Option<TimerId> {
            let (pos, _) = self
                .pending
                .iter()
                .enumerate()
                .min_by_key(|(i, (due, _))| (*due, *i))?;
            let (due, id) = self.pending.remove(pos);
            if due > self.clock {
                self.clock = due;
            }
            let effects = self.scheduler.on_timer(id, self.clock);
            self.apply(effects);
            Some(id)
        }

        fn advance_by(&mut self, by: Duration) {
            self.clock += by;
        }

        fn fire_until(&mut self, done: impl Fn(&Self) -> bool) {
            for _ in 0..100 {
                if done(self) {
                    return;
                }
                if self.fire_next().is_none() {
                    return;
                }
            }
        }
    }

    fn short_scripts() -> NarrativeScripts {
        NarrativeScripts {
            document_inspection: vec!["di-1".into(), "di-2".into()],
            external_verification: vec!["ev-1".into()],
            compliance_decision: vec!["co-1".into(), "co-2".into()],
        }
    }

    fn approved_progress() -> ProgressSnapshot {
        let mut reconciler = Reconciler::default();
        reconciler.attach(CASE);
        reconciler.ingest(ActivityEvent::new(
            CASE,
            Agent::DocumentInspector,
            "Extraction Complete",
            ActivityStatus::Success,
        ));
        reconciler.ingest(ActivityEvent::new(
            CASE,
            Agent::ExternalVerifier,
            "Verification Complete",
            ActivityStatus::Success,
        ));
        reconciler.ingest(
            ActivityEvent::new(CASE, Agent::ComplianceOfficer, "ACIP Decision", ActivityStatus::Decision)
                .with_data(EventData::decision(Decision::Approve, Some(RiskLevel::Low), Some(0.95))),
        );
        reconciler.snapshot()
    }

    fn progress_with(events: Vec<ActivityEvent>) -> ProgressSnapshot {
        let mut reconciler = Reconciler::default();
        reconciler.attach(CASE);
        for event in events {
            reconciler.ingest(event);
        }
        reconciler.snapshot()
    }

    #[test]
    fn test_start_arms_hard_timeout_and_lead_in() {
        let mut scheduler = PacingScheduler::new(
            PacingConfig::default(),
            NarrativeScripts::default(),
            FixedDelay::base(),
        );
        let effects = scheduler.start(Instant::now());
        let delays: Vec<(TimerKind, Duration)> = effects
            .iter()
            .filter_map(|e| match e {
                PacingEffect::ScheduleTimer { id, delay } => Some((id.kind, *delay)),
                _ => None,
            })
            .collect();
        assert_eq!(
            delays,
            vec![
                (TimerKind::HardTimeout, Duration::from_secs(30)),
                (TimerKind::LeadIn, Duration::from_millis(600)),
            ]
        );
        assert_eq!(scheduler.phase(), PacingPhase::LeadIn);
        assert!(scheduler.is_visible());
    }

    #[test]
    fn test_early_completion_never_skips_narration() {
        let mut h = Harness::new(short_scripts());
        h.start();
        h.observe(&approved_progress());
        let terminal_at = h.clock;

        h.fire_until(|h| h.scheduler.phase() == PacingPhase::Lingering);

        let messages: Vec<&str> = h.announced.iter().map(|(_, m)| m.as_str()).collect();
        assert_eq!(messages, vec!["di-1", "di-2", "ev-1", "co-1", "co-2"]);
        assert_eq!(h.narrated, Stage::TRACKED.to_vec());

        // Narration took longer than the minimum-visible window, so teardown
        // is due immediately.
        let deadline = h.scheduler.state(h.clock).minimum_display_deadline.unwrap();
        assert_eq!(deadline, terminal_at + Duration::from_millis(2_500));
        h.fire_next();
        assert_eq!(h.teardown, Some(CloseReason::Completed));
    }

    #[test]
    fn test_stage_waits_for_real_completion() {
        let mut h = Harness::new(short_scripts());
        h.start();
        h.fire_until(|h| {
            matches!(h.scheduler.phase(), PacingPhase::AwaitingCompletion { .. })
        });
        assert_eq!(
            h.scheduler.phase(),
            PacingPhase::AwaitingCompletion {
                stage: Stage::DocumentInspection
            }
        );
        // Only the hard timeout remains armed.
        assert_eq!(h.pending.len(), 1);

        h.advance_by(Duration::from_secs(3));
        h.observe(&progress_with(vec![ActivityEvent::new(
            CASE,
            Agent::DocumentInspector,
            "Extraction Complete",
            ActivityStatus::Success,
        )]));
        assert_eq!(h.narrated, vec![Stage::DocumentInspection]);
        assert_eq!(
            h.scheduler.phase(),
            PacingPhase::Waiting {
                stage: Stage::ExternalVerification,
                message_index: 0
            }
        );
        assert_eq!(h.scheduler.state(h.clock).step_elapsed, Duration::ZERO);
    }

    #[test]
    fn test_gating_hides_later_stages() {
        let mut h = Harness::new(short_scripts());
        h.start();
        let progress = approved_progress();
        h.observe(&progress);

        let gated = h.scheduler.gate(&progress.derivation);
        assert_eq!(gated[0].status, StageStatus::Success);
        for state in &gated[1..] {
            assert_eq!(state.status, StageStatus::Pending);
        }

        h.fire_next(); // lead-in
        let gated = h.scheduler.gate(&progress.derivation);
        assert_eq!(gated[1].status, StageStatus::Active);
        assert_eq!(gated[1].details.as_deref(), Some("di-1"));
        assert_eq!(gated[2].status, StageStatus::Pending);
        assert_eq!(gated[3].status, StageStatus::Pending);

        h.fire_until(|h| {
            h.scheduler.phase().narrated_stage() == Some(Stage::ComplianceDecision)
        });
        let gated = h.scheduler.gate(&progress.derivation);
        assert_eq!(gated[1].status, StageStatus::Success);
        assert_eq!(gated[2].status, StageStatus::Success);
        assert_eq!(gated[3].status, StageStatus::Active);

        h.fire_until(|h| h.teardown.is_some());
        assert_eq!(h.scheduler.gate(&progress.derivation), progress.derivation.stages);
    }

    #[test]
    fn test_hard_timeout_closes_unresolved() {
        let mut h = Harness::new(short_scripts());
        h.start();
        h.fire_until(|h| h.teardown.is_some());
        assert_eq!(h.teardown, Some(CloseReason::TimedOut));
        assert_eq!(h.scheduler.phase(), PacingPhase::Closed(CloseReason::TimedOut));
        assert!(!h.scheduler.is_visible());
    }

    #[test]
    fn test_cancel_makes_pending_timers_stale() {
        let mut h = Harness::new(short_scripts());
        h.start();
        let effects = h.scheduler.cancel();
        assert_eq!(
            effects,
            vec![PacingEffect::Teardown {
                reason: CloseReason::Cancelled
            }]
        );
        let announced_before = h.announced.len();
        while h.fire_next().is_some() {}
        assert_eq!(h.announced.len(), announced_before);
        assert_eq!(h.scheduler.phase(), PacingPhase::Closed(CloseReason::Cancelled));
    }

    #[test]
    fn test_restart_ignores_previous_generation() {
        let mut h = Harness::new(short_scripts());
        h.start();
        let old: Vec<TimerId> = h.pending.iter().map(|(_, id)| *id).collect();
        h.scheduler.cancel();
        h.pending.clear();
        h.start();
        for id in old {
            assert!(h.scheduler.on_timer(id, h.clock).is_empty());
        }
        assert_eq!(h.scheduler.phase(), PacingPhase::LeadIn);
    }

    #[test]
    fn test_abort_ends_narrative_at_open_stage() {
        let mut h = Harness::new(short_scripts());
        h.start();
        h.fire_next(); // lead-in
        h.observe(&progress_with(vec![
            ActivityEvent::new(CASE, Agent::DocumentInspector, "Extracting Data", ActivityStatus::InProgress),
            ActivityEvent::new(CASE, Agent::System, "Workflow Error", ActivityStatus::Error),
        ]));
        h.fire_until(|h| h.scheduler.phase() == PacingPhase::Lingering);
        assert!(h.narrated.is_empty());
        assert!(h.announced.iter().all(|(stage, _)| *stage == Stage::DocumentInspection));
        h.fire_next();
        assert_eq!(h.teardown, Some(CloseReason::Completed));
    }

    #[test]
    fn test_minimum_visible_measured_from_terminal_signal() {
        let mut h = Harness::new(short_scripts());
        h.start();
        h.observe(&progress_with(vec![
            ActivityEvent::new(CASE, Agent::DocumentInspector, "Extraction Complete", ActivityStatus::Success),
            ActivityEvent::new(CASE, Agent::ExternalVerifier, "Verification Complete", ActivityStatus::Success),
            ActivityEvent::new(CASE, Agent::ComplianceOfficer, "Assessing Risk", ActivityStatus::InProgress),
        ]));
        h.fire_until(|h| {
            h.scheduler.phase().narrated_stage() == Some(Stage::ComplianceDecision)
        });
        h.observe(&approved_progress());
        let terminal_at = h.clock;
        h.fire_until(|h| h.scheduler.phase() == PacingPhase::Lingering);
        assert!(h.teardown.is_none());
        h.fire_next();
        assert_eq!(h.teardown, Some(CloseReason::Completed));
        assert_eq!(h.clock, terminal_at + Duration::from_millis(2_500));
    }

    #[test]
    fn test_terminal_signal_near_deadline_completes() {
        let mut h = Harness::new(short_scripts());
        let started = h.clock;
        h.start();
        h.observe(&progress_with(vec![
            ActivityEvent::new(CASE, Agent::DocumentInspector, "Extraction Complete", ActivityStatus::Success),
            ActivityEvent::new(CASE, Agent::ExternalVerifier, "Verification Complete", ActivityStatus::Success),
            ActivityEvent::new(CASE, Agent::ComplianceOfficer, "Assessing Risk", ActivityStatus::InProgress),
        ]));
        h.fire_until(|h| {
            h.scheduler.phase()
                == PacingPhase::AwaitingCompletion {
                    stage: Stage::ComplianceDecision,
                }
        });

        h.clock = started + Duration::from_secs(29);
        h.observe(&approved_progress());
        let terminal_at = h.clock;
        assert_eq!(h.scheduler.phase(), PacingPhase::Lingering);
        assert_eq!(h.scheduler.state(h.clock).hard_timeout_deadline, None);

        // The 30 s timer still sits in the queue but no longer counts.
        h.fire_until(|h| h.teardown.is_some());
        assert_eq!(h.teardown, Some(CloseReason::Completed));
        assert_eq!(h.clock, terminal_at + Duration::from_millis(2_500));
    }
}
