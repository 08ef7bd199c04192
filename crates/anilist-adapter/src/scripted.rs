//! Scripted in-memory driver.
//!
//! Stands in for a real browser during tests and dry runs: the feed is
//! a vector, scrolling reveals a viewport at a time, and click results
//! follow a queued script. Shapes every probe exactly the way the
//! Chromium driver would.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use anilike_core_types::{FeedItem, ItemId};

use crate::driver::FeedDriver;
use crate::error::DriverError;
use crate::model::{LikeAck, PageSignals, ScrollProbe, StoredCookie};

/// Scripted result for one `click_like` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickScript {
    /// The like lands and the affordance toggles.
    Like,
    /// The affordance was already active.
    AlreadyLiked,
    /// The click fails with a retriable timeout.
    Transient,
    /// The site answers with throttle language.
    RateLimited,
    /// The session is rejected mid-run.
    SessionLost,
}

/// Pixels one feed row occupies in the synthetic page.
const ROW_PX: usize = 100;

struct Inner {
    opened: bool,
    entries: Vec<FeedItem>,
    viewport: usize,
    scrolls: usize,
    stall_after: Option<usize>,
    plan: VecDeque<ClickScript>,
    attempts: Vec<ItemId>,
    applied: Vec<ItemId>,
    logged_in: bool,
    revive_on_cookies: bool,
    cookies: Vec<StoredCookie>,
    signals: PageSignals,
}

/// [`FeedDriver`] implementation backed by scripted state.
pub struct ScriptedDriver {
    inner: Mutex<Inner>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::with_feed(Vec::new())
    }

    pub fn with_feed(entries: Vec<FeedItem>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                opened: false,
                entries,
                viewport: 5,
                scrolls: 0,
                stall_after: None,
                plan: VecDeque::new(),
                attempts: Vec::new(),
                applied: Vec::new(),
                logged_in: true,
                revive_on_cookies: false,
                cookies: Vec::new(),
                signals: PageSignals::default(),
            }),
        }
    }

    /// Load the feed from a JSON file holding an array of entries.
    pub fn from_fixture(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| DriverError::io(format!("fixture {} unreadable: {err}", path.display())))?;
        let entries: Vec<FeedItem> = serde_json::from_str(&raw).map_err(|err| {
            DriverError::internal(format!("fixture {} malformed: {err}", path.display()))
        })?;
        Ok(Self::with_feed(entries))
    }

    /// Fresh unliked entries, one per id, position equal to the id.
    pub fn feed(ids: &[u64]) -> Vec<FeedItem> {
        ids.iter()
            .map(|id| FeedItem::new(ItemId::from(id.to_string()), *id, false))
            .collect()
    }

    /// Entries revealed per scroll gesture.
    pub fn viewport(self, entries: usize) -> Self {
        self.inner.lock().viewport = entries.max(1);
        self
    }

    /// After this many gestures further scrolls stop advancing while
    /// the feed still claims more content. Models a wedged page.
    pub fn stall_after(self, scrolls: usize) -> Self {
        self.inner.lock().stall_after = Some(scrolls);
        self
    }

    /// Begin with a logged-out session.
    pub fn start_logged_out(self) -> Self {
        let mut inner = self.inner.lock();
        inner.logged_in = false;
        inner.signals = PageSignals {
            login_wall: true,
            hint: Some("session expired".to_string()),
            ..PageSignals::default()
        };
        drop(inner);
        self
    }

    /// Applying cookies restores the session to logged-in.
    pub fn revive_on_cookies(self) -> Self {
        self.inner.lock().revive_on_cookies = true;
        self
    }

    /// Queue click results; unqueued clicks default to [`ClickScript::Like`].
    pub fn queue_clicks(&self, scripts: impl IntoIterator<Item = ClickScript>) {
        self.inner.lock().plan.extend(scripts);
    }

    /// Append entries, as a feed mutating between visits would.
    pub fn push_entries(&self, more: Vec<FeedItem>) {
        self.inner.lock().entries.extend(more);
    }

    pub fn attempt_count(&self) -> usize {
        self.inner.lock().attempts.len()
    }

    pub fn applied_count(&self) -> usize {
        self.inner.lock().applied.len()
    }

    pub fn applied_ids(&self) -> Vec<ItemId> {
        self.inner.lock().applied.clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.inner.lock().scrolls
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().opened
    }

    pub fn entry_liked(&self, id: &str) -> bool {
        self.inner
            .lock()
            .entries
            .iter()
            .any(|entry| entry.id.as_str() == id && entry.liked)
    }

    fn loaded(inner: &Inner) -> usize {
        inner.entries.len().min((inner.scrolls + 1) * inner.viewport)
    }

    fn require_open(inner: &Inner) -> Result<(), DriverError> {
        if inner.opened {
            Ok(())
        } else {
            Err(DriverError::internal("scripted session not open"))
        }
    }
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedDriver for ScriptedDriver {
    async fn open(&self) -> Result<(), DriverError> {
        self.inner.lock().opened = true;
        Ok(())
    }

    async fn apply_cookies(&self, cookies: &[StoredCookie]) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        Self::require_open(&inner)?;
        inner.cookies = cookies.to_vec();
        if inner.revive_on_cookies {
            inner.logged_in = true;
            inner.signals = PageSignals::default();
        }
        Ok(())
    }

    async fn goto_feed(&self) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        Self::require_open(&inner)?;
        // A navigation lands back at the top of the page.
        inner.scrolls = 0;
        Ok(())
    }

    async fn logged_in(&self) -> Result<bool, DriverError> {
        let inner = self.inner.lock();
        Self::require_open(&inner)?;
        Ok(inner.logged_in)
    }

    async fn scroll_feed(&self, _step_px: u32) -> Result<ScrollProbe, DriverError> {
        let mut inner = self.inner.lock();
        Self::require_open(&inner)?;

        let before = Self::loaded(&inner);
        let more_to_load = before < inner.entries.len();
        let stalled = inner
            .stall_after
            .map_or(false, |limit| inner.scrolls >= limit)
            && more_to_load;
        if !stalled && more_to_load {
            inner.scrolls += 1;
        }

        let after = Self::loaded(&inner);
        Ok(ScrollProbe {
            offset: (after * ROW_PX) as u64,
            height: (inner.entries.len().max(1) * ROW_PX) as u64,
            at_bottom: after >= inner.entries.len(),
        })
    }

    async fn visible_entries(&self) -> Result<Vec<FeedItem>, DriverError> {
        let inner = self.inner.lock();
        Self::require_open(&inner)?;
        let loaded = Self::loaded(&inner);
        Ok(inner.entries[..loaded].to_vec())
    }

    async fn click_like(&self, item: &ItemId) -> Result<LikeAck, DriverError> {
        let mut inner = self.inner.lock();
        Self::require_open(&inner)?;
        inner.attempts.push(item.clone());

        match inner.plan.pop_front().unwrap_or(ClickScript::Like) {
            ClickScript::Like => {
                if let Some(entry) = inner.entries.iter_mut().find(|entry| &entry.id == item) {
                    entry.liked = true;
                }
                inner.applied.push(item.clone());
                inner.signals = PageSignals::default();
                Ok(LikeAck {
                    applied: true,
                    already_liked: false,
                })
            }
            ClickScript::AlreadyLiked => {
                if let Some(entry) = inner.entries.iter_mut().find(|entry| &entry.id == item) {
                    entry.liked = true;
                }
                Ok(LikeAck {
                    applied: false,
                    already_liked: true,
                })
            }
            ClickScript::Transient => Err(DriverError::timeout("scripted click timeout")),
            ClickScript::RateLimited => {
                inner.signals = PageSignals {
                    rate_limited: true,
                    login_wall: false,
                    hint: Some("too many requests".to_string()),
                };
                Err(DriverError::blocked("scripted throttle page"))
            }
            ClickScript::SessionLost => {
                inner.logged_in = false;
                inner.signals = PageSignals {
                    rate_limited: false,
                    login_wall: true,
                    hint: Some("session expired".to_string()),
                };
                Err(DriverError::session_lost("scripted session expiry"))
            }
        }
    }

    async fn page_signals(&self) -> Result<PageSignals, DriverError> {
        let inner = self.inner.lock();
        Self::require_open(&inner)?;
        Ok(inner.signals.clone())
    }

    async fn export_cookies(&self) -> Result<Vec<StoredCookie>, DriverError> {
        let inner = self.inner.lock();
        Self::require_open(&inner)?;
        Ok(inner.cookies.clone())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.inner.lock().opened = false;
        Ok(())
    }
}
