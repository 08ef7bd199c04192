//! One run, end to end.
//!
//! Order matters here: the cookie file is screened before any browser
//! starts, the stored session is proven before the engine moves, and
//! the refreshed cookies are written back only after a clean finish.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use anilike_engine::{Engine, RunReport, RunState, SessionAuth};
use anilike_feed_nav::Navigator;
use anilike_like_ledger::{read_snapshot, write_snapshot, JournalLedger, MemoryLedger};
use anilike_pacing::build_pacer;
use anilist_adapter::{ChromiumDriver, FeedDriver, ScriptedDriver};

use crate::auth::{persist_cookies, CookieAuth, CookieSession};
use crate::config::Config;

/// Environment fallback for [`RunOptions::fixture`].
pub const FEED_FIXTURE_ENV: &str = "ANILIKE_FEED_FIXTURE";

/// Per-invocation switches layered over the config file.
pub struct RunOptions {
    /// Pace and navigate, but never click; in-memory ledger.
    pub dry_run: bool,
    /// Wall-clock cap; overrides `run.max_duration_secs`.
    pub max_duration: Option<Duration>,
    /// Force a visible browser window.
    pub headed: bool,
    /// JSON feed file; when set the run uses the scripted driver
    /// instead of a live browser.
    pub fixture: Option<PathBuf>,
}

/// Run the bot once and report how it ended. Errors here are setup
/// failures; everything after engine start is folded into the report.
pub async fn execute(
    config: &Config,
    opts: &RunOptions,
    cancel: CancellationToken,
) -> Result<RunReport> {
    // Screen the cookie file before anything expensive happens.
    let session = CookieSession::load(&config.auth.cookie_path)?;

    match read_snapshot(&config.storage.stats_path) {
        Ok(Some(prior)) => info!(
            target: "runner",
            run_id = %prior.run_id,
            liked = prior.liked,
            skipped = prior.skipped,
            reason = prior.stop_reason.as_deref().unwrap_or("unknown"),
            "previous run snapshot found"
        ),
        Ok(None) => {}
        Err(err) => warn!(target: "runner", error = %err, "previous stats unreadable, ignoring"),
    }

    let driver = build_driver(config, opts)?;
    driver.open().await.context("starting the browser session")?;

    let result = drive(config, opts, cancel, driver.clone(), session).await;

    if let Err(err) = driver.close().await {
        warn!(target: "runner", error = %err, "browser shutdown was not clean");
    }

    result
}

fn build_driver(config: &Config, opts: &RunOptions) -> Result<Arc<dyn FeedDriver>> {
    if let Some(path) = &opts.fixture {
        let driver = ScriptedDriver::from_fixture(path)?;
        info!(target: "runner", fixture = %path.display(), "using scripted feed fixture");
        return Ok(Arc::new(driver));
    }

    let headless = config.driver.headless && !opts.headed;
    let driver = ChromiumDriver::new(config.site_profile(), config.chromium_config(headless));
    Ok(Arc::new(driver))
}

async fn drive(
    config: &Config,
    opts: &RunOptions,
    cancel: CancellationToken,
    driver: Arc<dyn FeedDriver>,
    session: CookieSession,
) -> Result<RunReport> {
    let auth = Arc::new(CookieAuth::new(driver.clone(), session.cookies().to_vec()));
    if !auth
        .validate()
        .await
        .context("validating the stored session")?
    {
        bail!(
            "stored cookies no longer authenticate; export a fresh set from a logged-in browser"
        );
    }

    let pacer = build_pacer(config.strategy, &config.pacing)?;
    let policy = config.backoff_policy();
    let engine_cfg = config.engine_config(opts.dry_run, opts.max_duration);
    let auth: Arc<dyn SessionAuth> = auth;

    let report = if opts.dry_run {
        // A rehearsal must never touch the durable processed set.
        let navigator = Navigator::new(driver.clone(), config.nav_config());
        let mut engine = Engine::new(
            driver.clone(),
            navigator,
            MemoryLedger::new(),
            pacer,
            auth,
            policy,
            engine_cfg,
            cancel,
        );
        engine.run().await
    } else {
        let ledger = JournalLedger::open(&config.storage.ledger_path)?;
        let navigator = Navigator::new(driver.clone(), config.nav_config());
        let stats_path = config.storage.stats_path.clone();
        let mut engine = Engine::new(
            driver.clone(),
            navigator,
            ledger,
            pacer,
            auth,
            policy,
            engine_cfg,
            cancel,
        )
        .with_stats_sink(move |stats| {
            if let Err(err) = write_snapshot(&stats_path, stats) {
                warn!(target: "runner", error = %err, "stats snapshot failed");
            }
        });
        engine.run().await
    };

    // The site rotates cookie values mid-session; after a clean run the
    // exported set replaces the file so the next run starts fresh.
    if report.state == RunState::Finished && !opts.dry_run {
        match driver.export_cookies().await {
            Ok(cookies) if !cookies.is_empty() => {
                if let Err(err) = persist_cookies(session.path(), &cookies) {
                    warn!(target: "runner", error = %err, "refreshed cookies not persisted");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(target: "runner", error = %err, "cookie export failed"),
        }
    }

    Ok(report)
}
