//! Data shapes exchanged between the drivers and the rest of the bot.

use serde::{Deserialize, Serialize};

/// Phrases on a page that suggest the site is throttling us.
pub const RATE_LIMIT_HINTS: &[&str] = &["too many requests", "rate limit", "slow down", "429"];

/// Phrases that suggest we are looking at a logged-out page.
pub const LOGIN_WALL_HINTS: &[&str] = &["log in to anilist", "sign up", "session expired"];

/// One browser cookie as stored on disk.
///
/// The serde aliases accept the field names used by common devtools
/// cookie exporters, so a file exported straight from the browser can
/// be pointed at without editing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default = "StoredCookie::default_domain")]
    pub domain: String,
    #[serde(default = "StoredCookie::default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, alias = "httpOnly")]
    pub http_only: bool,
    /// Unix seconds; absent for session cookies.
    #[serde(default, alias = "expirationDate")]
    pub expires: Option<f64>,
    #[serde(default, alias = "sameSite")]
    pub same_site: Option<String>,
}

impl StoredCookie {
    fn default_domain() -> String {
        ".anilist.co".to_string()
    }

    fn default_path() -> String {
        "/".to_string()
    }

    /// Whether the cookie is already past its expiry at `now_epoch`
    /// (unix seconds). Session cookies never expire on our side.
    pub fn expired(&self, now_epoch: f64) -> bool {
        matches!(self.expires, Some(at) if at > 0.0 && at < now_epoch)
    }
}

/// Result of one scroll gesture against the feed page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollProbe {
    /// Vertical scroll offset after the gesture, in page units.
    pub offset: u64,
    /// Total scrollable height at the time of the probe.
    pub height: u64,
    /// True when the viewport rests at the end of the loaded content.
    pub at_bottom: bool,
}

/// Soft signals scraped from the current page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSignals {
    /// The page shows throttling language.
    pub rate_limited: bool,
    /// The page shows a logged-out or login-prompt surface.
    pub login_wall: bool,
    /// The matched phrase, when one of the scans hit.
    pub hint: Option<String>,
}

impl PageSignals {
    /// Derive signals from visible page text plus whether a login wall
    /// element is present in the DOM.
    pub fn from_scan(body_text: &str, login_wall_visible: bool) -> Self {
        let lower = body_text.to_lowercase();
        let rate_hint = RATE_LIMIT_HINTS.iter().find(|h| lower.contains(**h)).copied();
        let login_hint = LOGIN_WALL_HINTS.iter().find(|h| lower.contains(**h)).copied();
        Self {
            rate_limited: rate_hint.is_some(),
            login_wall: login_wall_visible || login_hint.is_some(),
            hint: rate_hint.or(login_hint).map(str::to_string),
        }
    }
}

/// Acknowledgement returned by a like click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeAck {
    /// The affordance reads as active after the click.
    pub applied: bool,
    /// The item was already liked before we touched it.
    pub already_liked: bool,
}

/// Selectors and URLs describing the target site.
///
/// Kept as data rather than hardcoded strings inside the driver so a
/// markup change is a one-place fix.
#[derive(Clone, Debug)]
pub struct SiteProfile {
    /// Feed page the bot works against.
    pub feed_url: String,
    /// One activity entry in the feed.
    pub entry_selector: String,
    /// Permalink inside an entry; its href carries the activity id.
    pub entry_link_selector: String,
    /// Like affordance relative to an entry.
    pub like_button_selector: String,
    /// Class the affordance carries once the like is applied.
    pub liked_class: String,
    /// Element that only renders for an authenticated session.
    pub logged_in_selector: String,
    /// Element that only renders on the logged-out surface.
    pub login_wall_selector: String,
}

impl SiteProfile {
    /// Profile for anilist.co as of the current markup.
    pub fn anilist() -> Self {
        Self {
            feed_url: "https://anilist.co/home".to_string(),
            entry_selector: "div.activity-entry".to_string(),
            entry_link_selector: ".time a".to_string(),
            like_button_selector: ".actions .action.likes".to_string(),
            liked_class: "liked".to_string(),
            logged_in_selector: ".nav .user .avatar".to_string(),
            login_wall_selector: ".nav .links a[href='/login']".to_string(),
        }
    }

    /// Same profile pointed at a different feed URL.
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::anilist()
    }
}
