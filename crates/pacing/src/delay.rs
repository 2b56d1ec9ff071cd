//! Delay Generators
//!
//! Source of per-message dwell times. The scheduler only sees the trait, so
//! tests substitute a deterministic generator.

use std::time::Duration;

use case_review_core::Stage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the dwell time for the next message of `stage`.
pub trait DelayGenerator: Send {
    fn next_delay(&mut self, stage: Stage, base: Duration) -> Duration;
}

impl<F> DelayGenerator for F
where
    F: FnMut(Stage, Duration) -> Duration + Send,
{
    fn next_delay(&mut self, stage: Stage, base: Duration) -> Duration {
        self(stage, base)
    }
}

/// Uniform jitter on top of the base window.
pub struct RandomDelay {
    rng: StdRng,
    jitter_ratio: f64,
}

impl RandomDelay {
    pub fn new(jitter_ratio: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            jitter_ratio,
        }
    }

    pub fn seeded(jitter_ratio: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            jitter_ratio,
        }
    }
}

impl DelayGenerator for RandomDelay {
    fn next_delay(&mut self, _stage: Stage, base: Duration) -> Duration {
        let spread = base.as_secs_f64() * self.jitter_ratio.max(0.0);
        if spread <= 0.0 {
            return base;
        }
        base + Duration::from_secs_f64(self.rng.gen_range(0.0..=spread))
    }
}

/// Always returns the same delay, or the base window when unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay(pub Option<Duration>);

impl FixedDelay {
    pub fn base() -> Self {
        Self(None)
    }

    pub fn of(delay: Duration) -> Self {
        Self(Some(delay))
    }
}

impl DelayGenerator for FixedDelay {
    fn next_delay(&mut self, _stage: Stage, base: Duration) -> Duration {
        self.0.unwrap_or(base)
    }
}
