//! Failure classification and retry policy.
//!
//! One click either worked, failed in a way worth retrying, smells like
//! throttling, or ended the session. [`classify`] makes that call from
//! the driver result plus whatever the page itself admits to; the
//! [`BackoffPolicy`] then decides what a failure costs.

use std::time::Duration;

use anilike_core_types::ActionOutcome;
use anilist_adapter::{DriverError, DriverErrorKind, LikeAck, PageSignals};

/// Map a raw click result onto an outcome class.
///
/// Page signals outrank the error kind: throttle language on the page
/// makes the outcome a rate-limit suspicion no matter how the click
/// itself failed, and a login wall makes it fatal.
pub fn classify(result: &Result<LikeAck, DriverError>, signals: &PageSignals) -> ActionOutcome {
    match result {
        Ok(ack) if ack.applied || ack.already_liked => ActionOutcome::Success,
        Ok(_) => ActionOutcome::transient("click dispatched but the like did not register"),
        Err(err) => {
            if err.is_session_loss() || signals.login_wall {
                ActionOutcome::fatal(err.to_string())
            } else if signals.rate_limited || err.kind == DriverErrorKind::Blocked {
                ActionOutcome::RateLimitSuspected
            } else if err.is_retriable() {
                ActionOutcome::transient(err.to_string())
            } else {
                ActionOutcome::fatal(err.to_string())
            }
        }
    }
}

/// What to do about one failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the same item again after the pause.
    Retry { after: Duration },
    /// Record the item as skipped and move on. Only retry exhaustion
    /// produces this; nothing else skips an item.
    GiveUp,
    /// Stop working and hand control to session recovery. The item is
    /// left unrecorded so a later run can pick it up.
    Abort,
}

/// Retry and recovery knobs.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    /// Attempts per item before giving up.
    pub retry_ceiling: u32,
    /// First retry pause; doubles per attempt.
    pub backoff_base: Duration,
    /// Upper bound for the doubling.
    pub backoff_cap: Duration,
    /// Pause after a rate-limit suspicion.
    pub cooldown: Duration,
    /// Consecutive stalled scrolls before the run fails.
    pub stall_ceiling: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            retry_ceiling: 3,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(8),
            cooldown: Duration::from_secs(900),
            stall_ceiling: 5,
        }
    }
}

impl BackoffPolicy {
    /// Decide the fate of an item after its `attempt`-th try failed.
    /// Attempts are 1-based.
    pub fn handle(&self, outcome: &ActionOutcome, attempt: u32) -> RetryDecision {
        match outcome {
            // Nothing to handle; zero pause keeps the mapping total.
            ActionOutcome::Success => RetryDecision::Retry {
                after: Duration::ZERO,
            },
            ActionOutcome::TransientFailure { .. } => {
                if attempt >= self.retry_ceiling {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::Retry {
                        after: self.exponential(attempt),
                    }
                }
            }
            ActionOutcome::RateLimitSuspected => {
                if attempt >= self.retry_ceiling {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::Retry {
                        after: self.cooldown,
                    }
                }
            }
            ActionOutcome::FatalFailure { .. } => RetryDecision::Abort,
        }
    }

    /// Pause before re-probing a stalled feed; grows with the streak.
    pub fn stall_delay(&self, streak: u32) -> Duration {
        self.backoff_base.saturating_mul(streak.max(1) * 2)
    }

    fn exponential(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            retry_ceiling: 3,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(8),
            cooldown: Duration::from_secs(60),
            stall_ceiling: 5,
        }
    }

    #[test]
    fn applied_click_is_success() {
        let ok = Ok(LikeAck {
            applied: true,
            already_liked: false,
        });
        assert_eq!(classify(&ok, &PageSignals::default()), ActionOutcome::Success);
    }

    #[test]
    fn already_liked_counts_as_success() {
        let ok = Ok(LikeAck {
            applied: false,
            already_liked: true,
        });
        assert_eq!(classify(&ok, &PageSignals::default()), ActionOutcome::Success);
    }

    #[test]
    fn unregistered_click_is_transient() {
        let ok = Ok(LikeAck {
            applied: false,
            already_liked: false,
        });
        let outcome = classify(&ok, &PageSignals::default());
        assert!(matches!(outcome, ActionOutcome::TransientFailure { .. }));
    }

    #[test]
    fn timeout_is_transient() {
        let err = Err(DriverError::timeout("slow page"));
        let outcome = classify(&err, &PageSignals::default());
        assert!(matches!(outcome, ActionOutcome::TransientFailure { .. }));
    }

    #[test]
    fn throttle_language_outranks_error_kind() {
        let err = Err(DriverError::timeout("slow page"));
        let signals = PageSignals {
            rate_limited: true,
            login_wall: false,
            hint: Some("too many requests".into()),
        };
        assert_eq!(classify(&err, &signals), ActionOutcome::RateLimitSuspected);
    }

    #[test]
    fn blocked_page_reads_as_rate_limit() {
        let err = Err(DriverError::blocked("interstitial"));
        assert_eq!(
            classify(&err, &PageSignals::default()),
            ActionOutcome::RateLimitSuspected
        );
    }

    #[test]
    fn session_loss_is_fatal_even_with_throttle_text() {
        let err = Err(DriverError::session_lost("cookie rejected"));
        let signals = PageSignals {
            rate_limited: true,
            login_wall: true,
            hint: None,
        };
        assert!(matches!(
            classify(&err, &signals),
            ActionOutcome::FatalFailure { .. }
        ));
    }

    #[test]
    fn login_wall_makes_any_error_fatal() {
        let err = Err(DriverError::not_found("like control missing"));
        let signals = PageSignals {
            rate_limited: false,
            login_wall: true,
            hint: Some("sign up".into()),
        };
        assert!(matches!(
            classify(&err, &signals),
            ActionOutcome::FatalFailure { .. }
        ));
    }

    #[test]
    fn transient_backoff_doubles_up_to_the_cap() {
        let policy = policy();
        let outcome = ActionOutcome::transient("x");
        assert_eq!(
            policy.handle(&outcome, 1),
            RetryDecision::Retry {
                after: Duration::from_millis(500)
            }
        );
        assert_eq!(
            policy.handle(&outcome, 2),
            RetryDecision::Retry {
                after: Duration::from_millis(1000)
            }
        );

        let wide_open = BackoffPolicy {
            retry_ceiling: 32,
            ..policy
        };
        assert_eq!(
            wide_open.handle(&outcome, 10),
            RetryDecision::Retry {
                after: Duration::from_secs(8)
            }
        );
    }

    #[test]
    fn ceiling_exhaustion_gives_up() {
        let policy = policy();
        let outcome = ActionOutcome::transient("x");
        assert_eq!(policy.handle(&outcome, 3), RetryDecision::GiveUp);
        assert_eq!(
            policy.handle(&ActionOutcome::RateLimitSuspected, 3),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn rate_limit_waits_out_the_cooldown() {
        let policy = policy();
        assert_eq!(
            policy.handle(&ActionOutcome::RateLimitSuspected, 1),
            RetryDecision::Retry {
                after: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn fatal_aborts_immediately() {
        let policy = policy();
        assert_eq!(
            policy.handle(&ActionOutcome::fatal("session gone"), 1),
            RetryDecision::Abort
        );
    }

    #[test]
    fn stall_delay_grows_with_the_streak() {
        let policy = policy();
        assert_eq!(policy.stall_delay(1), Duration::from_secs(1));
        assert_eq!(policy.stall_delay(3), Duration::from_secs(3));
        assert!(policy.stall_delay(0) > Duration::ZERO);
    }
}
