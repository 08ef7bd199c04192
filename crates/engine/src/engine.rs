//! The control loop.
//!
//! One task owns everything: refill the pending queue from the
//! navigator, ask the pacer when to move, click, classify, and let the
//! backoff policy decide what a failure costs. Every sleep runs under
//! the cancellation token, so Ctrl-C lands between two awaits and never
//! mid-action.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use anilike_core_types::{ActionOutcome, FeedItem, RunId, RunStats};
use anilike_feed_nav::{NavError, Navigator};
use anilike_like_ledger::{Disposition, LedgerEntry, LedgerError, LikeLedger};
use anilike_pacing::{Pacer, Verdict};
use anilist_adapter::{DriverError, FeedDriver, PageSignals};

use crate::backoff::{classify, BackoffPolicy, RetryDecision};
use crate::metrics::EngineMetrics;
use crate::model::{EngineConfig, RunReport, RunState, StopReason};
use crate::session::SessionAuth;

type StatsSink = Box<dyn Fn(&RunStats) + Send>;

enum Flow {
    Continue,
    Stop(StopReason),
}

enum Waited {
    Done,
    Cancelled,
    DeadlineHit,
}

/// Drives one run of the feed-liking loop.
pub struct Engine<D, L>
where
    D: FeedDriver,
    L: LikeLedger,
{
    driver: D,
    navigator: Navigator<D>,
    ledger: L,
    pacer: Box<dyn Pacer>,
    auth: Arc<dyn SessionAuth>,
    policy: BackoffPolicy,
    cfg: EngineConfig,
    cancel: CancellationToken,
    metrics: EngineMetrics,
    stats: RunStats,
    state: RunState,
    pending: VecDeque<FeedItem>,
    acted: bool,
    stats_sink: Option<StatsSink>,
}

impl<D, L> Engine<D, L>
where
    D: FeedDriver,
    L: LikeLedger,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver: D,
        navigator: Navigator<D>,
        ledger: L,
        pacer: Box<dyn Pacer>,
        auth: Arc<dyn SessionAuth>,
        policy: BackoffPolicy,
        cfg: EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            navigator,
            ledger,
            pacer,
            auth,
            policy,
            cfg,
            cancel,
            metrics: EngineMetrics::new(),
            stats: RunStats::new(RunId::new()),
            state: RunState::Idle,
            pending: VecDeque::new(),
            acted: false,
            stats_sink: None,
        }
    }

    /// Called with the current stats at every checkpoint and at the end.
    pub fn with_stats_sink(mut self, sink: impl Fn(&RunStats) + Send + 'static) -> Self {
        self.stats_sink = Some(Box::new(sink));
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Counter handle; clones stay live after the run.
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.clone()
    }

    /// Run to completion. Consumes the feed until one of the stop
    /// conditions fires; never panics out of the loop.
    pub async fn run(&mut self) -> RunReport {
        let started = Instant::now();
        let deadline = self.cfg.max_duration.map(|limit| started + limit);
        self.state = RunState::Running;
        info!(
            target: "engine",
            run_id = %self.stats.run_id,
            strategy = self.pacer.label(),
            dry_run = self.cfg.dry_run,
            max_items = self.cfg.max_items_per_run,
            "run starting"
        );

        let mut stall_streak: u32 = 0;
        let reason = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Interrupted;
            }
            if let Some(at) = deadline {
                if Instant::now() >= at {
                    break StopReason::TimeBudget;
                }
            }
            if self.stats.processed() >= u64::from(self.cfg.max_items_per_run) {
                break StopReason::ItemBudget;
            }

            if self.pending.is_empty() {
                match self.navigator.next_batch().await {
                    Ok(batch) => {
                        stall_streak = 0;
                        if let Err(stop) = self.queue_batch(batch) {
                            break stop;
                        }
                        // Budgets get re-checked before the queue is touched.
                        continue;
                    }
                    Err(NavError::Exhausted { attempts }) => {
                        debug!(target: "engine", attempts, "feed exhausted");
                        break StopReason::FeedExhausted;
                    }
                    Err(NavError::Stalled { offset }) => {
                        stall_streak += 1;
                        self.metrics.record_stall();
                        warn!(target: "engine", offset, streak = stall_streak, "feed stalled");
                        if stall_streak >= self.policy.stall_ceiling {
                            break StopReason::Stalled;
                        }
                        match self.wait(self.policy.stall_delay(stall_streak), deadline).await {
                            Waited::Done => continue,
                            Waited::Cancelled => break StopReason::Interrupted,
                            Waited::DeadlineHit => break StopReason::TimeBudget,
                        }
                    }
                    Err(NavError::Driver(err)) => {
                        if err.is_session_loss() {
                            if self.recover_session().await {
                                continue;
                            }
                            break StopReason::AuthFailed;
                        }
                        stall_streak += 1;
                        warn!(
                            target: "engine",
                            error = %err,
                            streak = stall_streak,
                            "navigation error"
                        );
                        if stall_streak >= self.policy.stall_ceiling {
                            break StopReason::Fatal(format!("navigation keeps failing: {err}"));
                        }
                        match self.wait(self.policy.stall_delay(stall_streak), deadline).await {
                            Waited::Done => continue,
                            Waited::Cancelled => break StopReason::Interrupted,
                            Waited::DeadlineHit => break StopReason::TimeBudget,
                        }
                    }
                }
            }

            let now = Local::now().time();
            match self.pacer.decide(now) {
                Verdict::Hold { resume_in } => {
                    self.state = RunState::Paused;
                    info!(
                        target: "engine",
                        resume_in = ?resume_in,
                        "outside the working window, holding"
                    );
                    let waited = self.wait(resume_in, deadline).await;
                    self.state = RunState::Running;
                    match waited {
                        Waited::Done => continue,
                        Waited::Cancelled => break StopReason::Interrupted,
                        Waited::DeadlineHit => break StopReason::TimeBudget,
                    }
                }
                Verdict::Act { delay } => {
                    // The pacer spaces actions apart; the first action of
                    // a run has nothing to space against.
                    if self.acted {
                        match self.wait(delay, deadline).await {
                            Waited::Done => {}
                            Waited::Cancelled => break StopReason::Interrupted,
                            Waited::DeadlineHit => break StopReason::TimeBudget,
                        }
                    }
                    let Some(item) = self.pending.pop_front() else {
                        continue;
                    };
                    match self.process_item(item, deadline).await {
                        Flow::Continue => {}
                        Flow::Stop(stop) => break stop,
                    }
                }
            }
        };

        self.finish(reason, started)
    }

    /// Screen a navigator batch into the pending queue.
    fn queue_batch(&mut self, batch: Vec<FeedItem>) -> Result<(), StopReason> {
        let mut queued = 0usize;
        for item in batch {
            self.stats.items_seen += 1;
            if self.ledger.contains(&item.id) {
                continue;
            }
            if item.liked {
                // Already liked on-site, probably by hand. Record it so
                // it is never touched again.
                let entry = LedgerEntry::already_liked(item.id.clone(), item.position);
                self.mark(entry)
                    .map_err(|err| StopReason::Fatal(format!("ledger write failed: {err}")))?;
                debug!(target: "engine", item = %item.id, "pre-liked, reconciled");
                continue;
            }
            self.pending.push_back(item);
            queued += 1;
        }
        debug!(
            target: "engine",
            queued,
            pending = self.pending.len(),
            "batch queued"
        );
        Ok(())
    }

    /// Work one item to a terminal per-item state.
    async fn process_item(&mut self, item: FeedItem, deadline: Option<Instant>) -> Flow {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Flow::Stop(StopReason::Interrupted);
            }
            attempt += 1;
            self.acted = true;
            let (outcome, already) = self.attempt_click(&item).await;
            self.pacer.on_outcome(&outcome);

            if outcome.is_success() {
                let entry = if already {
                    LedgerEntry::already_liked(item.id.clone(), item.position)
                } else {
                    LedgerEntry::liked(item.id.clone(), item.position)
                };
                if let Err(err) = self.mark(entry) {
                    return Flow::Stop(StopReason::Fatal(format!("ledger write failed: {err}")));
                }
                if already {
                    debug!(target: "engine", item = %item.id, "already liked, reconciled");
                } else {
                    self.metrics.record_like();
                    info!(target: "engine", item = %item.id, attempt, "liked");
                }
                return Flow::Continue;
            }

            self.stats.failures += 1;
            let throttled = outcome == ActionOutcome::RateLimitSuspected;
            if throttled {
                self.stats.rate_limit_hits += 1;
                self.metrics.record_rate_limit();
            }

            match self.policy.handle(&outcome, attempt) {
                RetryDecision::Retry { after } => {
                    self.stats.retries += 1;
                    self.metrics.record_retry();
                    if throttled {
                        self.state = RunState::Paused;
                        warn!(
                            target: "engine",
                            item = %item.id,
                            cooldown = ?after,
                            "rate limit suspected, cooling down"
                        );
                    } else {
                        debug!(
                            target: "engine",
                            item = %item.id,
                            attempt,
                            pause = ?after,
                            outcome = %outcome,
                            "retrying"
                        );
                    }
                    let waited = self.wait(after, deadline).await;
                    if throttled {
                        self.state = RunState::Running;
                    }
                    match waited {
                        Waited::Done => continue,
                        Waited::Cancelled => return Flow::Stop(StopReason::Interrupted),
                        Waited::DeadlineHit => return Flow::Stop(StopReason::TimeBudget),
                    }
                }
                RetryDecision::GiveUp => {
                    let note = format!("gave up after {attempt} attempts: {outcome}");
                    let entry = LedgerEntry::skipped(item.id.clone(), item.position, note);
                    if let Err(err) = self.mark(entry) {
                        return Flow::Stop(StopReason::Fatal(format!("ledger write failed: {err}")));
                    }
                    self.metrics.record_skip();
                    warn!(
                        target: "engine",
                        item = %item.id,
                        attempts = attempt,
                        "skipped after exhausting retries"
                    );
                    return Flow::Continue;
                }
                RetryDecision::Abort => {
                    warn!(target: "engine", item = %item.id, "session lost mid-run");
                    if self.recover_session().await {
                        // The item stays unrecorded; a later run owns it.
                        return Flow::Continue;
                    }
                    return Flow::Stop(StopReason::AuthFailed);
                }
            }
        }
    }

    async fn attempt_click(&mut self, item: &FeedItem) -> (ActionOutcome, bool) {
        if self.cfg.dry_run {
            debug!(target: "engine", item = %item.id, "dry run, like suppressed");
            return (ActionOutcome::Success, false);
        }

        let result = match tokio::time::timeout(
            self.cfg.action_timeout,
            self.driver.click_like(&item.id),
        )
        .await
        {
            Ok(inner) => inner,
            Err(_) => Err(DriverError::timeout(format!(
                "click on {} ran past {:?}",
                item.id, self.cfg.action_timeout
            ))),
        };

        // The page is only interrogated on failure; a clean ack needs
        // no second opinion.
        let signals = if result.is_err() {
            match self.driver.page_signals().await {
                Ok(signals) => signals,
                Err(err) => {
                    debug!(target: "engine", error = %err, "signal scan failed, assuming none");
                    PageSignals::default()
                }
            }
        } else {
            PageSignals::default()
        };

        let already = matches!(&result, Ok(ack) if ack.already_liked && !ack.applied);
        (classify(&result, &signals), already)
    }

    async fn recover_session(&mut self) -> bool {
        self.metrics.record_reauth();
        info!(target: "engine", "attempting session recovery");
        match self.auth.validate().await {
            Ok(true) => {
                self.navigator.reset();
                self.pending.clear();
                info!(target: "engine", "session restored, rewalking the feed");
                true
            }
            Ok(false) => {
                error!(target: "engine", "stored credentials no longer authenticate");
                false
            }
            Err(err) => {
                error!(target: "engine", error = %err, "session recovery failed");
                false
            }
        }
    }

    /// Record a terminal per-item state. Returns only once the entry is
    /// durable; the caller stops the run if this fails.
    fn mark(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        let disposition = entry.disposition;
        self.ledger.record(entry)?;
        match disposition {
            Disposition::Liked => self.stats.liked += 1,
            Disposition::AlreadyLiked | Disposition::Skipped => self.stats.skipped += 1,
        }

        let processed = self.stats.processed();
        if self.cfg.checkpoint_every > 0 && processed % u64::from(self.cfg.checkpoint_every) == 0 {
            info!(
                target: "engine",
                processed,
                liked = self.stats.liked,
                skipped = self.stats.skipped,
                failures = self.stats.failures,
                "checkpoint"
            );
            if let Some(sink) = &self.stats_sink {
                sink(&self.stats);
            }
        }
        Ok(())
    }

    /// Cancellable, deadline-capped sleep. Every pause in the loop goes
    /// through here.
    async fn wait(&self, requested: Duration, deadline: Option<Instant>) -> Waited {
        let (span, truncated) = match deadline {
            Some(at) => {
                let left = at.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Waited::DeadlineHit;
                }
                if left <= requested {
                    (left, true)
                } else {
                    (requested, false)
                }
            }
            None => (requested, false),
        };
        tokio::select! {
            _ = self.cancel.cancelled() => Waited::Cancelled,
            _ = tokio::time::sleep(span) => {
                if truncated {
                    Waited::DeadlineHit
                } else {
                    Waited::Done
                }
            }
        }
    }

    fn finish(&mut self, reason: StopReason, started: Instant) -> RunReport {
        self.state = reason.final_state();
        self.stats.elapsed_ms = started.elapsed().as_millis() as u64;
        self.stats.stop_reason = Some(reason.to_string());
        if let Some(sink) = &self.stats_sink {
            sink(&self.stats);
        }

        let snap = self.metrics.snapshot();
        if self.state == RunState::Finished {
            info!(
                target: "engine",
                reason = %reason,
                liked = self.stats.liked,
                skipped = self.stats.skipped,
                failures = self.stats.failures,
                retries = snap.retries,
                rate_limits = snap.rate_limits,
                reauths = snap.reauths,
                elapsed_ms = self.stats.elapsed_ms,
                "run finished"
            );
        } else {
            error!(
                target: "engine",
                reason = %reason,
                liked = self.stats.liked,
                skipped = self.stats.skipped,
                failures = self.stats.failures,
                elapsed_ms = self.stats.elapsed_ms,
                "run failed"
            );
        }

        RunReport {
            state: self.state,
            reason,
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StaticAuth;
    use anilike_feed_nav::NavConfig;
    use anilike_like_ledger::{JournalLedger, MemoryLedger};
    use anilike_pacing::{build_pacer, PacingConfig, StrategyKind};
    use anilist_adapter::{ClickScript, ScriptedDriver};
    use async_trait::async_trait;

    fn fixed_pacer(base_ms: u64) -> Box<dyn Pacer> {
        let cfg = PacingConfig {
            base_delay_ms: base_ms,
            min_delay_ms: base_ms,
            ..PacingConfig::default()
        };
        build_pacer(StrategyKind::Fixed, &cfg).unwrap()
    }

    fn adaptive_pacer() -> Box<dyn Pacer> {
        let cfg = PacingConfig {
            min_delay_ms: 1_000,
            max_delay_ms: 60_000,
            base_delay_ms: 1_000,
            ..PacingConfig::default()
        };
        build_pacer(StrategyKind::Adaptive, &cfg).unwrap()
    }

    fn engine_over(
        driver: Arc<ScriptedDriver>,
        pacer: Box<dyn Pacer>,
        policy: BackoffPolicy,
        cfg: EngineConfig,
    ) -> Engine<Arc<ScriptedDriver>, MemoryLedger> {
        let navigator = Navigator::new(driver.clone(), NavConfig::default());
        Engine::new(
            driver,
            navigator,
            MemoryLedger::new(),
            pacer,
            Arc::new(StaticAuth::valid()),
            policy,
            cfg,
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_pacing_three_likes_two_delays() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[
            103, 102, 101,
        ])));
        driver.open().await.unwrap();
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            BackoffPolicy::default(),
            EngineConfig::default(),
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.reason, StopReason::FeedExhausted);
        assert_eq!(report.stats.liked, 3);
        assert_eq!(driver.applied_count(), 3);
        // Three actions, two 2s gaps between them.
        assert!(
            report.stats.elapsed_ms >= 4_000,
            "expected at least 4s of pacing, got {}ms",
            report.stats.elapsed_ms
        );
        assert!(report.stats.elapsed_ms < 4_500);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_with_journal_never_relikes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("likes.jsonl");

        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[9, 8, 7])));
        driver.open().await.unwrap();
        let navigator = Navigator::new(driver.clone(), NavConfig::default());
        let mut engine = Engine::new(
            driver.clone(),
            navigator,
            JournalLedger::open(&path).unwrap(),
            fixed_pacer(2_000),
            Arc::new(StaticAuth::valid()),
            BackoffPolicy::default(),
            EngineConfig::default(),
            CancellationToken::new(),
        );
        let first = engine.run().await;
        assert_eq!(first.stats.liked, 3);

        // Same feed after a process restart.
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[9, 8, 7])));
        driver.open().await.unwrap();
        let navigator = Navigator::new(driver.clone(), NavConfig::default());
        let mut engine = Engine::new(
            driver.clone(),
            navigator,
            JournalLedger::open(&path).unwrap(),
            fixed_pacer(2_000),
            Arc::new(StaticAuth::valid()),
            BackoffPolicy::default(),
            EngineConfig::default(),
            CancellationToken::new(),
        );
        let second = engine.run().await;

        assert_eq!(second.state, RunState::Finished);
        assert_eq!(second.stats.liked, 0);
        assert_eq!(driver.attempt_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_stall_fails_the_run() {
        let driver = Arc::new(
            ScriptedDriver::with_feed(ScriptedDriver::feed(&[110, 109, 108, 107, 106, 105]))
                .viewport(2)
                .stall_after(1),
        );
        driver.open().await.unwrap();
        let policy = BackoffPolicy {
            stall_ceiling: 2,
            ..BackoffPolicy::default()
        };
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            policy,
            EngineConfig::default(),
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.reason, StopReason::Stalled);
        assert_eq!(report.exit_code(), 1);
        // Work done before the stall is kept.
        assert_eq!(report.stats.liked, 4);
        assert_eq!(engine.metrics().snapshot().stalls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_ceiling_skips_the_item_and_moves_on() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[33, 32, 31])));
        driver.open().await.unwrap();
        driver.queue_clicks([
            ClickScript::Transient,
            ClickScript::Transient,
            ClickScript::Transient,
        ]);
        let mut engine = engine_over(
            driver.clone(),
            adaptive_pacer(),
            BackoffPolicy {
                retry_ceiling: 3,
                ..BackoffPolicy::default()
            },
            EngineConfig::default(),
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.liked, 2);
        assert_eq!(report.stats.retries, 2);
        assert_eq!(report.stats.failures, 3);
        assert_eq!(driver.attempt_count(), 5);
        assert!(!driver.entry_liked("33"));
        assert!(driver.entry_liked("32"));
        assert!(driver.entry_liked("31"));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_cools_down_before_the_next_attempt() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[21])));
        driver.open().await.unwrap();
        driver.queue_clicks([ClickScript::RateLimited]);
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            BackoffPolicy {
                cooldown: Duration::from_secs(30),
                ..BackoffPolicy::default()
            },
            EngineConfig::default(),
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.stats.liked, 1);
        assert_eq!(report.stats.rate_limit_hits, 1);
        assert_eq!(driver.attempt_count(), 2);
        assert!(
            report.stats.elapsed_ms >= 30_000,
            "cooldown not respected: {}ms",
            report.stats.elapsed_ms
        );
    }

    struct ReapplyAuth {
        driver: Arc<ScriptedDriver>,
    }

    #[async_trait]
    impl SessionAuth for ReapplyAuth {
        async fn validate(&self) -> Result<bool, DriverError> {
            self.driver.apply_cookies(&[]).await?;
            self.driver.goto_feed().await?;
            self.driver.logged_in().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_loss_recovers_and_leaves_the_item_for_next_run() {
        let driver = Arc::new(
            ScriptedDriver::with_feed(ScriptedDriver::feed(&[44, 43])).revive_on_cookies(),
        );
        driver.open().await.unwrap();
        driver.queue_clicks([ClickScript::Like, ClickScript::SessionLost]);
        let navigator = Navigator::new(driver.clone(), NavConfig::default());
        let mut engine = Engine::new(
            driver.clone(),
            navigator,
            MemoryLedger::new(),
            fixed_pacer(2_000),
            Arc::new(ReapplyAuth {
                driver: driver.clone(),
            }),
            BackoffPolicy::default(),
            EngineConfig::default(),
            CancellationToken::new(),
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.stats.liked, 1);
        // The in-flight item is not recorded either way.
        assert_eq!(report.stats.skipped, 0);
        assert!(driver.logged_in().await.unwrap());
        assert_eq!(engine.metrics().snapshot().reauths, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_recovery_ends_the_run_as_auth_failed() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[44, 43])));
        driver.open().await.unwrap();
        driver.queue_clicks([ClickScript::SessionLost]);
        let navigator = Navigator::new(driver.clone(), NavConfig::default());
        let mut engine = Engine::new(
            driver.clone(),
            navigator,
            MemoryLedger::new(),
            fixed_pacer(2_000),
            Arc::new(StaticAuth::invalid()),
            BackoffPolicy::default(),
            EngineConfig::default(),
            CancellationToken::new(),
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.reason, StopReason::AuthFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_cleanly_mid_sleep() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[5, 4, 3])));
        driver.open().await.unwrap();
        let cancel = CancellationToken::new();
        let navigator = Navigator::new(driver.clone(), NavConfig::default());
        let mut engine = Engine::new(
            driver.clone(),
            navigator,
            MemoryLedger::new(),
            fixed_pacer(2_000),
            Arc::new(StaticAuth::valid()),
            BackoffPolicy::default(),
            EngineConfig::default(),
            cancel.clone(),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            canceller.cancel();
        });

        let report = engine.run().await;
        assert_eq!(report.reason, StopReason::Interrupted);
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.exit_code(), 130);
        assert_eq!(report.stats.liked, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn item_budget_ends_the_run() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[
            15, 14, 13, 12, 11,
        ])));
        driver.open().await.unwrap();
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            BackoffPolicy::default(),
            EngineConfig {
                max_items_per_run: 2,
                ..EngineConfig::default()
            },
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.reason, StopReason::ItemBudget);
        assert_eq!(report.stats.processed(), 2);
        assert_eq!(driver.applied_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn time_budget_caps_the_run() {
        let ids: Vec<u64> = (101..=130).rev().collect();
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&ids)));
        driver.open().await.unwrap();
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            BackoffPolicy::default(),
            EngineConfig {
                max_duration: Some(Duration::from_secs(5)),
                ..EngineConfig::default()
            },
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.reason, StopReason::TimeBudget);
        // Actions at 0s, 2s and 4s fit inside the 5s budget.
        assert_eq!(report.stats.liked, 3);
        assert!(report.stats.elapsed_ms >= 4_900 && report.stats.elapsed_ms <= 5_200);
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_paces_but_never_clicks() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[66, 65, 64])));
        driver.open().await.unwrap();
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            BackoffPolicy::default(),
            EngineConfig {
                dry_run: true,
                ..EngineConfig::default()
            },
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.stats.liked, 3);
        assert_eq!(driver.attempt_count(), 0);
        assert!(report.stats.elapsed_ms >= 4_000);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_liked_items_are_reconciled_without_clicks() {
        let mut entries = ScriptedDriver::feed(&[12, 11, 10]);
        entries[1].liked = true;
        let driver = Arc::new(ScriptedDriver::with_feed(entries));
        driver.open().await.unwrap();
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            BackoffPolicy::default(),
            EngineConfig::default(),
        );

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        assert_eq!(report.stats.liked, 2);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(driver.attempt_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoint_sink_sees_progress_and_final_stats() {
        let driver = Arc::new(ScriptedDriver::with_feed(ScriptedDriver::feed(&[3, 2, 1])));
        driver.open().await.unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let mut engine = engine_over(
            driver.clone(),
            fixed_pacer(2_000),
            BackoffPolicy::default(),
            EngineConfig {
                checkpoint_every: 2,
                ..EngineConfig::default()
            },
        )
        .with_stats_sink(move |stats| {
            sink_seen.lock().unwrap().push(stats.processed());
        });

        let report = engine.run().await;
        assert_eq!(report.state, RunState::Finished);
        let recorded = seen.lock().unwrap().clone();
        // One checkpoint at two processed items, one final flush at three.
        assert_eq!(recorded, vec![2, 3]);
    }
}
