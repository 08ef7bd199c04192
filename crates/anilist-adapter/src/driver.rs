//! The capability surface the engine needs from a browser session.

use std::sync::Arc;

use async_trait::async_trait;

use anilike_core_types::{FeedItem, ItemId};

use crate::error::DriverError;
use crate::model::{LikeAck, PageSignals, ScrollProbe, StoredCookie};

/// A live session against the activity feed.
///
/// Implementations own whatever browser state they need; callers only
/// see feed items, scroll probes and like acknowledgements. The real
/// driver is [`ChromiumDriver`](crate::chromium::ChromiumDriver); tests
/// and dry runs use [`ScriptedDriver`](crate::scripted::ScriptedDriver).
#[async_trait]
pub trait FeedDriver: Send + Sync {
    /// Start the underlying session. Must be called before anything else.
    async fn open(&self) -> Result<(), DriverError>;

    /// Install stored cookies into the session.
    async fn apply_cookies(&self, cookies: &[StoredCookie]) -> Result<(), DriverError>;

    /// Navigate to the activity feed and let it settle.
    async fn goto_feed(&self) -> Result<(), DriverError>;

    /// Whether the current page renders as an authenticated session.
    async fn logged_in(&self) -> Result<bool, DriverError>;

    /// Scroll the feed down by roughly `step_px` and report the result.
    async fn scroll_feed(&self, step_px: u32) -> Result<ScrollProbe, DriverError>;

    /// Harvest the activity entries currently present in the DOM.
    async fn visible_entries(&self) -> Result<Vec<FeedItem>, DriverError>;

    /// Click the like affordance of one entry.
    async fn click_like(&self, item: &ItemId) -> Result<LikeAck, DriverError>;

    /// Scrape soft signals (throttle language, login walls) off the page.
    async fn page_signals(&self) -> Result<PageSignals, DriverError>;

    /// Export the session cookies as they stand now.
    async fn export_cookies(&self) -> Result<Vec<StoredCookie>, DriverError>;

    /// Tear the session down. Idempotent.
    async fn close(&self) -> Result<(), DriverError>;
}

#[async_trait]
impl<D> FeedDriver for Arc<D>
where
    D: FeedDriver + ?Sized,
{
    async fn open(&self) -> Result<(), DriverError> {
        (**self).open().await
    }

    async fn apply_cookies(&self, cookies: &[StoredCookie]) -> Result<(), DriverError> {
        (**self).apply_cookies(cookies).await
    }

    async fn goto_feed(&self) -> Result<(), DriverError> {
        (**self).goto_feed().await
    }

    async fn logged_in(&self) -> Result<bool, DriverError> {
        (**self).logged_in().await
    }

    async fn scroll_feed(&self, step_px: u32) -> Result<ScrollProbe, DriverError> {
        (**self).scroll_feed(step_px).await
    }

    async fn visible_entries(&self) -> Result<Vec<FeedItem>, DriverError> {
        (**self).visible_entries().await
    }

    async fn click_like(&self, item: &ItemId) -> Result<LikeAck, DriverError> {
        (**self).click_like(item).await
    }

    async fn page_signals(&self) -> Result<PageSignals, DriverError> {
        (**self).page_signals().await
    }

    async fn export_cookies(&self) -> Result<Vec<StoredCookie>, DriverError> {
        (**self).export_cookies().await
    }

    async fn close(&self) -> Result<(), DriverError> {
        (**self).close().await
    }
}
