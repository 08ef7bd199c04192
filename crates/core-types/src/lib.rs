//! Shared value types for the AniLike feed engine.
//!
//! Everything in here is plain data passed between the navigator, the
//! pacing strategies, the like ledger and the engine. No I/O.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one activity-feed entry.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single engine run, stamped into logs and snapshots.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry discovered in the activity feed.
///
/// `position` is monotonically comparable in feed order: AniList
/// activity ids grow over time and the feed lists newest first, so
/// scrolling down means strictly decreasing positions.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: ItemId,
    pub position: u64,
    pub liked: bool,
}

impl FeedItem {
    pub fn new(id: impl Into<ItemId>, position: u64, liked: bool) -> Self {
        Self {
            id: id.into(),
            position,
            liked,
        }
    }
}

/// Coarse class of an [`ActionOutcome`], kept `Copy` for outcome windows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Transient,
    RateLimit,
    Fatal,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Transient => "transient",
            OutcomeKind::RateLimit => "rate_limit",
            OutcomeKind::Fatal => "fatal",
        };
        write!(f, "{label}")
    }
}

/// Classified result of one like attempt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    TransientFailure { reason: String },
    RateLimitSuspected,
    FatalFailure { reason: String },
}

impl ActionOutcome {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientFailure {
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::FatalFailure {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            ActionOutcome::Success => OutcomeKind::Success,
            ActionOutcome::TransientFailure { .. } => OutcomeKind::Transient,
            ActionOutcome::RateLimitSuspected => OutcomeKind::RateLimit,
            ActionOutcome::FatalFailure { .. } => OutcomeKind::Fatal,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Success => write!(f, "success"),
            ActionOutcome::TransientFailure { reason } => write!(f, "transient: {reason}"),
            ActionOutcome::RateLimitSuspected => write!(f, "rate limit suspected"),
            ActionOutcome::FatalFailure { reason } => write!(f, "fatal: {reason}"),
        }
    }
}

/// Aggregate counters for one engine run.
///
/// Owned and mutated by the engine; snapshotted to disk at checkpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub items_seen: u64,
    pub liked: u64,
    pub skipped: u64,
    pub failures: u64,
    pub retries: u64,
    pub rate_limit_hits: u64,
    pub elapsed_ms: u64,
    pub stop_reason: Option<String>,
}

impl RunStats {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            items_seen: 0,
            liked: 0,
            skipped: 0,
            failures: 0,
            retries: 0,
            rate_limit_hits: 0,
            elapsed_ms: 0,
            stop_reason: None,
        }
    }

    /// Items that reached a terminal per-item state (liked or skipped).
    pub fn processed(&self) -> u64 {
        self.liked + self.skipped
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new(RunId::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_kind_mapping() {
        assert_eq!(ActionOutcome::Success.kind(), OutcomeKind::Success);
        assert_eq!(
            ActionOutcome::transient("timeout").kind(),
            OutcomeKind::Transient
        );
        assert_eq!(
            ActionOutcome::RateLimitSuspected.kind(),
            OutcomeKind::RateLimit
        );
        assert_eq!(ActionOutcome::fatal("401").kind(), OutcomeKind::Fatal);
    }

    #[test]
    fn outcome_serde_round_trip() {
        let outcome = ActionOutcome::transient("element not found");
        let json = serde_json::to_string(&outcome).expect("serialize");
        let back: ActionOutcome = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(outcome, back);
    }

    #[test]
    fn stats_processed_counts_both_terminals() {
        let mut stats = RunStats::new(RunId::new());
        stats.liked = 3;
        stats.skipped = 2;
        assert_eq!(stats.processed(), 5);
    }

    #[test]
    fn item_ids_are_value_equal() {
        let a = ItemId::from("812345");
        let b = ItemId("812345".to_string());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "812345");
    }
}
