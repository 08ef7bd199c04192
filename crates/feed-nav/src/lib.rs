//! Forward-only navigation over a mutating activity feed.
//!
//! The feed shifts underneath us between scrolls: new activity lands on
//! top, old entries lazy-load at the bottom. [`Navigator`] hides that
//! churn behind a single rule, a high-water mark over item positions.
//! Positions are activity ids, which grow over time, so the feed reads
//! newest-first and scrolling down means strictly decreasing positions.
//! Once a batch has been handed out, only items strictly below the
//! lowest position returned so far qualify again. The cursor never
//! moves backwards, and items that appear above it later are left for
//! the next run.

use anilike_core_types::FeedItem;
use anilist_adapter::{DriverError, FeedDriver};
use thiserror::Error;
use tracing::{debug, warn};

/// Why the navigator could not produce another batch.
#[derive(Debug, Error)]
pub enum NavError {
    /// Nothing new after repeated passes; the feed is done for this run.
    #[error("feed exhausted after {attempts} empty passes")]
    Exhausted { attempts: u32 },
    /// Scrolling stopped moving the page while content still remained.
    #[error("feed stalled at offset {offset}")]
    Stalled { offset: u64 },
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl NavError {
    /// Exhaustion is the healthy end of a feed, not a failure.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, NavError::Exhausted { .. })
    }

    pub fn is_stalled(&self) -> bool {
        matches!(self, NavError::Stalled { .. })
    }
}

/// Scroll cadence knobs.
#[derive(Clone, Copy, Debug)]
pub struct NavConfig {
    /// Pixels per scroll gesture.
    pub scroll_step_px: u32,
    /// Empty passes tolerated before the feed counts as exhausted.
    pub empty_attempts: u32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            scroll_step_px: 1600,
            empty_attempts: 3,
        }
    }
}

/// Where the walk currently stands.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeedCursor {
    /// Lowest position handed out so far; `None` before the first batch.
    pub watermark: Option<u64>,
    /// Scroll offset reported by the last probe.
    pub scroll_offset: u64,
}

/// Walks the feed downwards and returns batches of unseen items.
pub struct Navigator<D: FeedDriver> {
    driver: D,
    cfg: NavConfig,
    cursor: FeedCursor,
}

impl<D: FeedDriver> Navigator<D> {
    pub fn new(driver: D, cfg: NavConfig) -> Self {
        Self {
            driver,
            cfg,
            cursor: FeedCursor::default(),
        }
    }

    pub fn cursor(&self) -> FeedCursor {
        self.cursor
    }

    /// Forget the scroll position but keep the high-water mark, so a
    /// freshly reloaded page can be walked down again without handing
    /// out anything twice.
    pub fn reset(&mut self) {
        self.cursor.scroll_offset = 0;
    }

    /// Advance the feed until a batch of unseen items turns up.
    ///
    /// Scrolls, harvests, filters against the watermark, and repeats on
    /// empty passes up to the configured ceiling. An unmoving page away
    /// from the bottom is reported as [`NavError::Stalled`] right away;
    /// the caller decides how many of those in a row it will tolerate.
    pub async fn next_batch(&mut self) -> Result<Vec<FeedItem>, NavError> {
        let mut empty_rounds = 0u32;
        loop {
            let probe = self.driver.scroll_feed(self.cfg.scroll_step_px).await?;
            let moved = probe.offset != self.cursor.scroll_offset;
            let visible = self.driver.visible_entries().await?;
            let fresh: Vec<FeedItem> = visible
                .into_iter()
                .filter(|item| self.is_fresh(item))
                .collect();
            self.cursor.scroll_offset = probe.offset;

            if !fresh.is_empty() {
                if let Some(lowest) = fresh.iter().map(|item| item.position).min() {
                    self.cursor.watermark = Some(match self.cursor.watermark {
                        Some(mark) => mark.min(lowest),
                        None => lowest,
                    });
                }
                debug!(
                    target: "nav",
                    batch = fresh.len(),
                    watermark = ?self.cursor.watermark,
                    offset = probe.offset,
                    "fresh batch"
                );
                return Ok(fresh);
            }

            if !moved && !probe.at_bottom {
                warn!(
                    target: "nav",
                    offset = probe.offset,
                    height = probe.height,
                    "scroll gesture did not advance the page"
                );
                return Err(NavError::Stalled {
                    offset: probe.offset,
                });
            }

            empty_rounds += 1;
            if empty_rounds >= self.cfg.empty_attempts {
                debug!(target: "nav", attempts = empty_rounds, "feed exhausted");
                return Err(NavError::Exhausted {
                    attempts: empty_rounds,
                });
            }
        }
    }

    fn is_fresh(&self, item: &FeedItem) -> bool {
        match self.cursor.watermark {
            None => true,
            Some(mark) => item.position < mark,
        }
    }
}
