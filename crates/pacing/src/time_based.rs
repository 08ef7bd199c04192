use std::time::Duration;

use anilike_core_types::ActionOutcome;
use chrono::NaiveTime;
use tracing::warn;

use crate::config::{ConfigError, PacingConfig};
use crate::schedule::ActiveHours;
use crate::{Pacer, Verdict};

/// Schedule-only strategy: the verdict depends on the clock, never on
/// outcome feedback.
///
/// Inside the active window it acts at the base interval. Outside it,
/// either the configured slow interval applies or the strategy holds
/// until the window opens again.
pub struct TimeBasedPacer {
    hours: Option<ActiveHours>,
    base: Duration,
    off_hours: Option<Duration>,
}

impl TimeBasedPacer {
    pub fn new(cfg: &PacingConfig) -> Result<Self, ConfigError> {
        let hours = cfg.active_hours.as_ref().map(ActiveHours::parse).transpose()?;
        if hours.is_none() {
            warn!(
                target: "pacing",
                "time_based strategy has no active_hours; behaving like fixed"
            );
        }
        Ok(Self {
            hours,
            base: Duration::from_millis(cfg.clamped_base_ms()),
            off_hours: cfg.off_hours_delay_ms.map(Duration::from_millis),
        })
    }
}

impl Pacer for TimeBasedPacer {
    fn decide(&mut self, now: NaiveTime) -> Verdict {
        match &self.hours {
            None => Verdict::act(self.base),
            Some(hours) if hours.contains(now) => Verdict::act(self.base),
            Some(hours) => match self.off_hours {
                Some(slow) => Verdict::act(slow.max(self.base)),
                None => Verdict::hold(hours.until_open(now)),
            },
        }
    }

    fn on_outcome(&mut self, _outcome: &ActionOutcome) {}

    fn label(&self) -> &'static str {
        "time_based"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActiveHoursCfg;

    fn cfg_with_hours(off_hours_delay_ms: Option<u64>) -> PacingConfig {
        PacingConfig {
            base_delay_ms: 3_000,
            min_delay_ms: 1_000,
            max_delay_ms: 60_000,
            active_hours: Some(ActiveHoursCfg {
                start: "09:00".into(),
                end: "17:00".into(),
            }),
            off_hours_delay_ms,
            ..PacingConfig::default()
        }
    }

    fn clock(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn acts_at_base_inside_the_window() {
        let mut pacer = TimeBasedPacer::new(&cfg_with_hours(None)).expect("build");
        let verdict = pacer.decide(clock(11));
        assert_eq!(verdict, Verdict::act(Duration::from_millis(3_000)));
    }

    #[test]
    fn holds_until_open_outside_the_window() {
        let mut pacer = TimeBasedPacer::new(&cfg_with_hours(None)).expect("build");
        let verdict = pacer.decide(clock(3));
        assert_eq!(
            verdict,
            Verdict::hold(Duration::from_secs(6 * 3_600))
        );
    }

    #[test]
    fn slow_mode_acts_with_the_off_hours_interval() {
        let mut pacer = TimeBasedPacer::new(&cfg_with_hours(Some(20_000))).expect("build");
        let verdict = pacer.decide(clock(3));
        assert_eq!(verdict, Verdict::act(Duration::from_millis(20_000)));
        assert!(verdict.should_act());
    }

    #[test]
    fn outcomes_do_not_move_the_schedule() {
        let mut pacer = TimeBasedPacer::new(&cfg_with_hours(None)).expect("build");
        let before = pacer.decide(clock(10));
        for _ in 0..10 {
            pacer.on_outcome(&ActionOutcome::RateLimitSuspected);
        }
        assert_eq!(pacer.decide(clock(10)), before);
    }
}
