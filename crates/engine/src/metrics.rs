//! Run counters, shared by handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cloneable handle over one run's counters.
#[derive(Clone, Debug, Default)]
pub struct EngineMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    likes: AtomicU64,
    skips: AtomicU64,
    retries: AtomicU64,
    rate_limits: AtomicU64,
    stalls: AtomicU64,
    reauths: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_like(&self) {
        self.inner.likes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.inner.skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit(&self) {
        self.inner.rate_limits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stall(&self) {
        self.inner.stalls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reauth(&self) {
        self.inner.reauths.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            likes: self.inner.likes.load(Ordering::Relaxed),
            skips: self.inner.skips.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
            rate_limits: self.inner.rate_limits.load(Ordering::Relaxed),
            stalls: self.inner.stalls.load(Ordering::Relaxed),
            reauths: self.inner.reauths.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub likes: u64,
    pub skips: u64,
    pub retries: u64,
    pub rate_limits: u64,
    pub stalls: u64,
    pub reauths: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_share_counters() {
        let metrics = EngineMetrics::new();
        let other = metrics.clone();
        metrics.record_like();
        other.record_like();
        other.record_retry();

        let snap = metrics.snapshot();
        assert_eq!(snap.likes, 2);
        assert_eq!(snap.retries, 1);
        assert_eq!(snap.stalls, 0);
    }
}
