use std::time::Duration;

use anilike_core_types::ActionOutcome;
use chrono::NaiveTime;

use crate::config::PacingConfig;
use crate::{Pacer, Verdict};

/// Constant-interval strategy. Never adapts, never holds.
#[derive(Clone, Debug)]
pub struct FixedPacer {
    delay: Duration,
}

impl FixedPacer {
    pub fn new(cfg: &PacingConfig) -> Self {
        Self {
            delay: Duration::from_millis(cfg.clamped_base_ms()),
        }
    }
}

impl Pacer for FixedPacer {
    fn decide(&mut self, _now: NaiveTime) -> Verdict {
        Verdict::act(self.delay)
    }

    fn on_outcome(&mut self, _outcome: &ActionOutcome) {}

    fn label(&self) -> &'static str {
        "fixed"
    }
}
