//! Pacing strategies for the AniLike feed engine.
//!
//! A strategy answers two questions, over and over: may the next like
//! action run now, and how long should the engine wait first. All four
//! variants sit behind the flat [`Pacer`] trait so the engine stays
//! strategy-agnostic; each variant owns its own state and nothing else.

pub mod config;

mod adaptive;
mod fixed;
mod schedule;
mod smart;
mod time_based;
mod window;

pub use adaptive::AdaptivePacer;
pub use config::{ActiveHoursCfg, ConfigError, PacingConfig};
pub use fixed::FixedPacer;
pub use schedule::ActiveHours;
pub use smart::SmartPacer;
pub use time_based::TimeBasedPacer;
pub use window::OutcomeWindow;

use std::fmt;
use std::time::Duration;

use anilike_core_types::ActionOutcome;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Which strategy a run uses. Fixed for the run's lifetime.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Fixed,
    TimeBased,
    Adaptive,
    Smart,
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::Smart
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StrategyKind::Fixed => "fixed",
            StrategyKind::TimeBased => "time_based",
            StrategyKind::Adaptive => "adaptive",
            StrategyKind::Smart => "smart",
        };
        write!(f, "{label}")
    }
}

/// Verdict for the next like action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Act after waiting `delay`.
    Act { delay: Duration },
    /// Do not act now; consult again after `resume_in`.
    Hold { resume_in: Duration },
}

impl Verdict {
    pub fn act(delay: Duration) -> Self {
        Verdict::Act { delay }
    }

    pub fn hold(resume_in: Duration) -> Self {
        Verdict::Hold { resume_in }
    }

    pub fn should_act(&self) -> bool {
        matches!(self, Verdict::Act { .. })
    }

    /// The wait attached to the verdict, whichever arm it is.
    pub fn wait(&self) -> Duration {
        match self {
            Verdict::Act { delay } => *delay,
            Verdict::Hold { resume_in } => *resume_in,
        }
    }
}

/// A pacing strategy.
///
/// `decide` is consulted before every action with the current wall-clock
/// time of day; `on_outcome` absorbs the classified result of every
/// attempt. Both touch only the strategy's own state.
pub trait Pacer: Send {
    fn decide(&mut self, now: NaiveTime) -> Verdict;

    fn on_outcome(&mut self, outcome: &ActionOutcome);

    /// Short label for logs.
    fn label(&self) -> &'static str;
}

/// Build the configured strategy variant.
pub fn build_pacer(kind: StrategyKind, cfg: &PacingConfig) -> Result<Box<dyn Pacer>, ConfigError> {
    cfg.validate()?;
    let pacer: Box<dyn Pacer> = match kind {
        StrategyKind::Fixed => Box::new(FixedPacer::new(cfg)),
        StrategyKind::TimeBased => Box::new(TimeBasedPacer::new(cfg)?),
        StrategyKind::Adaptive => Box::new(AdaptivePacer::new(cfg)),
        StrategyKind::Smart => Box::new(SmartPacer::new(cfg)?),
    };
    Ok(pacer)
}
