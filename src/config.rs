//! Run configuration.
//!
//! One YAML file, every field defaulted, so an empty file (or none at
//! all) produces a working setup. The sections mirror the crates they
//! feed: `pacing` goes to the strategy builder, `retry` to the backoff
//! policy, `driver` to the browser adapter.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use anilike_engine::{BackoffPolicy, EngineConfig};
use anilike_feed_nav::NavConfig;
use anilike_pacing::{PacingConfig, StrategyKind};
use anilist_adapter::{ChromiumConfig, SiteProfile};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Pacing strategy for this run.
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub driver: DriverSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub log: LogSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            pacing: PacingConfig::default(),
            run: RunSection::default(),
            retry: RetrySection::default(),
            driver: DriverSection::default(),
            auth: AuthSection::default(),
            storage: StorageSection::default(),
            log: LogSection::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSection {
    /// Items processed before the run ends on its own.
    #[serde(default = "RunSection::default_max_items_per_run")]
    pub max_items_per_run: u32,
    /// Items between stats checkpoints.
    #[serde(default = "RunSection::default_checkpoint_interval")]
    pub checkpoint_interval: u32,
    /// Wall-clock cap in seconds; the CLI flag overrides this.
    #[serde(default)]
    pub max_duration_secs: Option<u64>,
}

impl RunSection {
    fn default_max_items_per_run() -> u32 {
        120
    }

    fn default_checkpoint_interval() -> u32 {
        10
    }
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_items_per_run: Self::default_max_items_per_run(),
            checkpoint_interval: Self::default_checkpoint_interval(),
            max_duration_secs: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrySection {
    /// Attempts per item before it is skipped.
    #[serde(default = "RetrySection::default_retry_ceiling")]
    pub retry_ceiling: u32,
    #[serde(default = "RetrySection::default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "RetrySection::default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// Cooldown after a suspected rate limit.
    #[serde(default = "RetrySection::default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Consecutive navigation stalls before the run fails.
    #[serde(default = "RetrySection::default_stall_ceiling")]
    pub stall_ceiling: u32,
    /// Consecutive empty scroll passes before the feed counts as done.
    #[serde(default = "RetrySection::default_empty_attempts")]
    pub empty_attempts: u32,
}

impl RetrySection {
    fn default_retry_ceiling() -> u32 {
        3
    }

    fn default_backoff_base_ms() -> u64 {
        500
    }

    fn default_backoff_cap_ms() -> u64 {
        8_000
    }

    fn default_cooldown_secs() -> u64 {
        900
    }

    fn default_stall_ceiling() -> u32 {
        5
    }

    fn default_empty_attempts() -> u32 {
        3
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            retry_ceiling: Self::default_retry_ceiling(),
            backoff_base_ms: Self::default_backoff_base_ms(),
            backoff_cap_ms: Self::default_backoff_cap_ms(),
            cooldown_secs: Self::default_cooldown_secs(),
            stall_ceiling: Self::default_stall_ceiling(),
            empty_attempts: Self::default_empty_attempts(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverSection {
    #[serde(default = "DriverSection::default_headless")]
    pub headless: bool,
    /// Chrome/Chromium binary; autodetected when absent.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Browser profile directory; ephemeral when absent.
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
    #[serde(default = "DriverSection::default_feed_url")]
    pub feed_url: String,
    #[serde(default = "DriverSection::default_scroll_step_px")]
    pub scroll_step_px: u32,
    /// Upper bound for a single like click.
    #[serde(default = "DriverSection::default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    /// Upper bound for protocol requests, navigation included.
    #[serde(default = "DriverSection::default_nav_timeout_ms")]
    pub nav_timeout_ms: u64,
}

impl DriverSection {
    fn default_headless() -> bool {
        true
    }

    fn default_feed_url() -> String {
        "https://anilist.co/home".to_string()
    }

    fn default_scroll_step_px() -> u32 {
        1_600
    }

    fn default_action_timeout_ms() -> u64 {
        12_000
    }

    fn default_nav_timeout_ms() -> u64 {
        20_000
    }
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            headless: Self::default_headless(),
            executable: None,
            user_data_dir: None,
            feed_url: Self::default_feed_url(),
            scroll_step_px: Self::default_scroll_step_px(),
            action_timeout_ms: Self::default_action_timeout_ms(),
            nav_timeout_ms: Self::default_nav_timeout_ms(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// JSON array of cookies exported from a logged-in browser.
    #[serde(default = "AuthSection::default_cookie_path")]
    pub cookie_path: PathBuf,
}

impl AuthSection {
    fn default_cookie_path() -> PathBuf {
        PathBuf::from("data/cookies.json")
    }
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            cookie_path: Self::default_cookie_path(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageSection {
    /// Append-only journal of processed items.
    #[serde(default = "StorageSection::default_ledger_path")]
    pub ledger_path: PathBuf,
    /// Stats snapshot from the latest run.
    #[serde(default = "StorageSection::default_stats_path")]
    pub stats_path: PathBuf,
}

impl StorageSection {
    fn default_ledger_path() -> PathBuf {
        PathBuf::from("data/processed.jsonl")
    }

    fn default_stats_path() -> PathBuf {
        PathBuf::from("data/stats.json")
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            ledger_path: Self::default_ledger_path(),
            stats_path: Self::default_stats_path(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogSection {
    /// Default filter; `RUST_LOG` wins when set.
    #[serde(default = "LogSection::default_level")]
    pub level: String,
    /// Optional log file alongside stderr output.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LogSection {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            file: None,
        }
    }
}

/// Where the effective configuration came from; the caller logs it once
/// the subscriber is up.
#[derive(Clone, Debug)]
pub enum ConfigSource {
    File(PathBuf),
    /// The checked path did not exist; built-in defaults are in effect.
    Defaults(PathBuf),
}

impl Config {
    /// Load from the explicit path, else `<config_dir>/anilike/config.yaml`,
    /// else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let config: Config = serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            Ok((config, ConfigSource::File(path)))
        } else {
            Ok((Config::default(), ConfigSource::Defaults(path)))
        }
    }

    pub fn engine_config(&self, dry_run: bool, max_duration: Option<Duration>) -> EngineConfig {
        EngineConfig {
            max_items_per_run: self.run.max_items_per_run,
            max_duration: max_duration
                .or_else(|| self.run.max_duration_secs.map(Duration::from_secs)),
            checkpoint_every: self.run.checkpoint_interval,
            action_timeout: Duration::from_millis(self.driver.action_timeout_ms),
            dry_run,
        }
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            retry_ceiling: self.retry.retry_ceiling,
            backoff_base: Duration::from_millis(self.retry.backoff_base_ms),
            backoff_cap: Duration::from_millis(self.retry.backoff_cap_ms),
            cooldown: Duration::from_secs(self.retry.cooldown_secs),
            stall_ceiling: self.retry.stall_ceiling,
        }
    }

    pub fn nav_config(&self) -> NavConfig {
        NavConfig {
            scroll_step_px: self.driver.scroll_step_px,
            empty_attempts: self.retry.empty_attempts,
        }
    }

    pub fn chromium_config(&self, headless: bool) -> ChromiumConfig {
        ChromiumConfig {
            headless,
            executable: self.driver.executable.clone(),
            user_data_dir: self.driver.user_data_dir.clone(),
            nav_timeout: Duration::from_millis(self.driver.nav_timeout_ms),
            ..ChromiumConfig::default()
        }
    }

    pub fn site_profile(&self) -> SiteProfile {
        SiteProfile::anilist().with_feed_url(self.driver.feed_url.as_str())
    }
}

fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("anilike");
    path.push("config.yaml");
    path
}
