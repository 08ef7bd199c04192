use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use crate::config::{ActiveHoursCfg, ConfigError};

const DAY_SECS: i64 = 86_400;

/// Daily wall-clock window during which the bot acts at full pace.
///
/// The window may wrap midnight: start 22:00 / end 06:00 covers the
/// night hours.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActiveHours {
    start: NaiveTime,
    end: NaiveTime,
}

impl ActiveHours {
    pub fn parse(cfg: &ActiveHoursCfg) -> Result<Self, ConfigError> {
        let start = parse_clock(&cfg.start)?;
        let end = parse_clock(&cfg.end)?;
        if start == end {
            return Err(ConfigError::EmptyActiveHours);
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.start < self.end {
            now >= self.start && now < self.end
        } else {
            now >= self.start || now < self.end
        }
    }

    /// Time from `now` until the window next opens; zero inside it.
    pub fn until_open(&self, now: NaiveTime) -> Duration {
        if self.contains(now) {
            return Duration::ZERO;
        }
        let now_s = i64::from(now.num_seconds_from_midnight());
        let start_s = i64::from(self.start.num_seconds_from_midnight());
        let mut wait = start_s - now_s;
        if wait <= 0 {
            wait += DAY_SECS;
        }
        Duration::from_secs(wait as u64)
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::BadClock {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(start: &str, end: &str) -> ActiveHours {
        ActiveHours::parse(&ActiveHoursCfg {
            start: start.into(),
            end: end.into(),
        })
        .expect("parse")
    }

    fn clock(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid clock")
    }

    #[test]
    fn plain_window_contains_daytime() {
        let w = hours("09:00", "17:00");
        assert!(w.contains(clock(9, 0)));
        assert!(w.contains(clock(12, 30)));
        assert!(!w.contains(clock(17, 0)));
        assert!(!w.contains(clock(3, 0)));
    }

    #[test]
    fn wrapped_window_covers_the_night() {
        let w = hours("22:00", "06:00");
        assert!(w.contains(clock(23, 0)));
        assert!(w.contains(clock(5, 59)));
        assert!(!w.contains(clock(12, 0)));
        assert!(!w.contains(clock(6, 0)));
    }

    #[test]
    fn until_open_counts_up_to_start() {
        let w = hours("09:00", "17:00");
        assert_eq!(w.until_open(clock(3, 0)), Duration::from_secs(6 * 3_600));
        assert_eq!(w.until_open(clock(10, 0)), Duration::ZERO);
        // Past the window: wait rolls over to tomorrow's start.
        assert_eq!(w.until_open(clock(21, 0)), Duration::from_secs(12 * 3_600));
    }

    #[test]
    fn degenerate_window_is_rejected() {
        let err = ActiveHours::parse(&ActiveHoursCfg {
            start: "08:00".into(),
            end: "08:00".into(),
        });
        assert!(matches!(err, Err(ConfigError::EmptyActiveHours)));
    }
}
