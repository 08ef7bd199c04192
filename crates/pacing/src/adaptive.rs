use std::time::Duration;

use anilike_core_types::{ActionOutcome, OutcomeKind};
use chrono::NaiveTime;
use tracing::trace;

use crate::config::PacingConfig;
use crate::window::OutcomeWindow;
use crate::{Pacer, Verdict};

/// Failure-responsive strategy.
///
/// The interval grows multiplicatively on failures (sharper for
/// suspected rate limits) and decays back toward the floor once the
/// bounded outcome window shows an unbroken run of successes. Growth is
/// capped by the ceiling, decay by the floor, so the interval never
/// leaves the configured envelope.
pub struct AdaptivePacer {
    current_ms: f64,
    floor_ms: f64,
    ceiling_ms: f64,
    growth: f64,
    rate_limit_growth: f64,
    recovery: f64,
    recovery_after: usize,
    window: OutcomeWindow,
}

impl AdaptivePacer {
    pub fn new(cfg: &PacingConfig) -> Self {
        Self {
            current_ms: cfg.clamped_base_ms() as f64,
            floor_ms: cfg.min_delay_ms as f64,
            ceiling_ms: cfg.max_delay_ms as f64,
            growth: cfg.growth_factor,
            rate_limit_growth: cfg.rate_limit_factor,
            recovery: cfg.recovery_factor,
            recovery_after: cfg.recovery_after as usize,
            window: OutcomeWindow::new(cfg.window),
        }
    }

    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.current_ms.round() as u64)
    }
}

impl Pacer for AdaptivePacer {
    fn decide(&mut self, _now: NaiveTime) -> Verdict {
        Verdict::act(self.current_delay())
    }

    fn on_outcome(&mut self, outcome: &ActionOutcome) {
        let kind = outcome.kind();
        self.window.push(kind);
        match kind {
            OutcomeKind::Success => {
                if self.window.tail_successes() >= self.recovery_after {
                    self.current_ms = (self.current_ms * self.recovery).max(self.floor_ms);
                }
            }
            OutcomeKind::Transient => {
                self.current_ms = (self.current_ms * self.growth).min(self.ceiling_ms);
            }
            OutcomeKind::RateLimit => {
                self.current_ms = (self.current_ms * self.rate_limit_growth).min(self.ceiling_ms);
            }
            // Session loss ends the item cycle elsewhere; the pacing
            // stance is left untouched.
            OutcomeKind::Fatal => {}
        }
        trace!(
            target: "pacing",
            outcome = %kind,
            delay_ms = self.current_ms.round() as u64,
            "adaptive interval adjusted"
        );
    }

    fn label(&self) -> &'static str {
        "adaptive"
    }
}
