//! Run lifecycle types.

use std::fmt;
use std::time::Duration;

use anilike_core_types::RunStats;

/// Where a run stands.
///
/// `Idle` exists only before `run` is called. `Paused` shows up while
/// the engine sits out a rate-limit cooldown or an off-hours window;
/// the loop itself never exits in that state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Finished,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Finished => "finished",
            RunState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Why the loop stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The feed ran out of content. The healthy ending.
    FeedExhausted,
    /// The per-run item budget was used up.
    ItemBudget,
    /// The wall-clock budget was used up.
    TimeBudget,
    /// Cancelled from outside, usually Ctrl-C.
    Interrupted,
    /// The page stopped responding to scrolling, repeatedly.
    Stalled,
    /// The session was lost and could not be restored.
    AuthFailed,
    /// Something unrecoverable, message attached.
    Fatal(String),
}

impl StopReason {
    pub fn final_state(&self) -> RunState {
        match self {
            StopReason::FeedExhausted
            | StopReason::ItemBudget
            | StopReason::TimeBudget
            | StopReason::Interrupted => RunState::Finished,
            StopReason::Stalled | StopReason::AuthFailed | StopReason::Fatal(_) => RunState::Failed,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FeedExhausted => f.write_str("feed exhausted"),
            StopReason::ItemBudget => f.write_str("item budget reached"),
            StopReason::TimeBudget => f.write_str("time budget reached"),
            StopReason::Interrupted => f.write_str("interrupted"),
            StopReason::Stalled => f.write_str("feed stalled"),
            StopReason::AuthFailed => f.write_str("authentication failed"),
            StopReason::Fatal(message) => write!(f, "fatal: {message}"),
        }
    }
}

/// Engine knobs that are not pacing policy.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Items processed before the run ends on its own.
    pub max_items_per_run: u32,
    /// Wall-clock ceiling for the whole run.
    pub max_duration: Option<Duration>,
    /// Progress checkpoint cadence, in processed items. Zero disables.
    pub checkpoint_every: u32,
    /// Deadline for a single like click.
    pub action_timeout: Duration,
    /// Walk and pace the feed but never click.
    pub dry_run: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_items_per_run: 120,
            max_duration: None,
            checkpoint_every: 10,
            action_timeout: Duration::from_secs(12),
            dry_run: false,
        }
    }
}

/// What a completed run looks like from outside.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub state: RunState,
    pub reason: StopReason,
    pub stats: RunStats,
}

impl RunReport {
    /// Process exit code for this run: 0 clean, 1 failed, 130 interrupted.
    pub fn exit_code(&self) -> i32 {
        if self.reason == StopReason::Interrupted {
            return 130;
        }
        match self.state {
            RunState::Finished => 0,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reasons_map_to_final_states() {
        assert_eq!(StopReason::FeedExhausted.final_state(), RunState::Finished);
        assert_eq!(StopReason::ItemBudget.final_state(), RunState::Finished);
        assert_eq!(StopReason::Interrupted.final_state(), RunState::Finished);
        assert_eq!(StopReason::Stalled.final_state(), RunState::Failed);
        assert_eq!(StopReason::AuthFailed.final_state(), RunState::Failed);
        assert_eq!(
            StopReason::Fatal("ledger gone".into()).final_state(),
            RunState::Failed
        );
    }

    #[test]
    fn exit_codes_follow_state_and_interrupt() {
        let report = |reason: StopReason| RunReport {
            state: reason.final_state(),
            reason,
            stats: RunStats::default(),
        };
        assert_eq!(report(StopReason::FeedExhausted).exit_code(), 0);
        assert_eq!(report(StopReason::Stalled).exit_code(), 1);
        assert_eq!(report(StopReason::Interrupted).exit_code(), 130);
    }

    #[test]
    fn terminal_states() {
        assert!(RunState::Finished.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Paused.is_terminal());
        assert!(!RunState::Running.is_terminal());
    }
}
