//! Pacing configuration with serde defaults, loaded from the `pacing`
//! section of the run config.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::ActiveHours;

/// Rejections raised while validating a pacing section.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_delay_ms {min} exceeds max_delay_ms {max}")]
    InvertedEnvelope { min: u64, max: u64 },
    #[error("growth_factor must be greater than 1.0, got {0}")]
    GrowthFactor(f64),
    #[error("rate_limit_factor must be greater than 1.0, got {0}")]
    RateLimitFactor(f64),
    #[error("recovery_factor must be inside (0.0, 1.0), got {0}")]
    RecoveryFactor(f64),
    #[error("window must hold at least one outcome")]
    EmptyWindow,
    #[error("active hours value '{value}' is not HH:MM")]
    BadClock { value: String },
    #[error("active hours start and end are the same instant")]
    EmptyActiveHours,
    #[error("off_hours_delay_ms {value} is outside the envelope [{min}, {max}]")]
    OffHoursDelay { value: u64, min: u64, max: u64 },
}

/// Daily activity window in wall-clock `HH:MM`; may wrap midnight.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActiveHoursCfg {
    pub start: String,
    pub end: String,
}

/// Tunables shared by the pacing strategies.
///
/// Every field carries a serde default so a partial YAML section parses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Floor of the delay envelope.
    #[serde(default = "PacingConfig::default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Ceiling of the delay envelope.
    #[serde(default = "PacingConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Starting interval, clamped into the envelope.
    #[serde(default = "PacingConfig::default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Multiplier applied on a transient failure.
    #[serde(default = "PacingConfig::default_growth_factor")]
    pub growth_factor: f64,
    /// Multiplier applied on a suspected rate limit.
    #[serde(default = "PacingConfig::default_rate_limit_factor")]
    pub rate_limit_factor: f64,
    /// Decay multiplier applied per recovery step.
    #[serde(default = "PacingConfig::default_recovery_factor")]
    pub recovery_factor: f64,
    /// Consecutive successes required before recovery starts.
    #[serde(default = "PacingConfig::default_recovery_after")]
    pub recovery_after: u32,
    /// Bounded outcome-window length.
    #[serde(default = "PacingConfig::default_window")]
    pub window: usize,
    /// Symmetric jitter bound for the smart strategy, in milliseconds.
    #[serde(default = "PacingConfig::default_jitter_ms")]
    pub jitter_ms: u64,
    /// RNG seed for the jitter term; `null` draws one from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub active_hours: Option<ActiveHoursCfg>,
    /// Slow-mode delay outside active hours; `null` holds instead.
    #[serde(default)]
    pub off_hours_delay_ms: Option<u64>,
}

impl PacingConfig {
    fn default_min_delay_ms() -> u64 {
        1_500
    }

    fn default_max_delay_ms() -> u64 {
        45_000
    }

    fn default_base_delay_ms() -> u64 {
        4_000
    }

    fn default_growth_factor() -> f64 {
        1.6
    }

    fn default_rate_limit_factor() -> f64 {
        3.0
    }

    fn default_recovery_factor() -> f64 {
        0.75
    }

    fn default_recovery_after() -> u32 {
        4
    }

    fn default_window() -> usize {
        32
    }

    fn default_jitter_ms() -> u64 {
        900
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Base delay forced into the `[min, max]` envelope.
    pub fn clamped_base_ms(&self) -> u64 {
        self.base_delay_ms.clamp(self.min_delay_ms, self.max_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvertedEnvelope {
                min: self.min_delay_ms,
                max: self.max_delay_ms,
            });
        }
        if self.growth_factor <= 1.0 {
            return Err(ConfigError::GrowthFactor(self.growth_factor));
        }
        if self.rate_limit_factor <= 1.0 {
            return Err(ConfigError::RateLimitFactor(self.rate_limit_factor));
        }
        if self.recovery_factor <= 0.0 || self.recovery_factor >= 1.0 {
            return Err(ConfigError::RecoveryFactor(self.recovery_factor));
        }
        if self.window == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if let Some(hours) = &self.active_hours {
            ActiveHours::parse(hours)?;
        }
        // Slow mode must obey the same envelope the strategies do.
        if let Some(slow) = self.off_hours_delay_ms {
            if slow < self.min_delay_ms || slow > self.max_delay_ms {
                return Err(ConfigError::OffHoursDelay {
                    value: slow,
                    min: self.min_delay_ms,
                    max: self.max_delay_ms,
                });
            }
        }
        Ok(())
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: Self::default_min_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
            base_delay_ms: Self::default_base_delay_ms(),
            growth_factor: Self::default_growth_factor(),
            rate_limit_factor: Self::default_rate_limit_factor(),
            recovery_factor: Self::default_recovery_factor(),
            recovery_after: Self::default_recovery_after(),
            window: Self::default_window(),
            jitter_ms: Self::default_jitter_ms(),
            seed: None,
            active_hours: None,
            off_hours_delay_ms: None,
        }
    }
}
