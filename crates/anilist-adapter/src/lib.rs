//! Browser driver for the AniList activity feed.
//!
//! [`FeedDriver`] is the seam between the bot engine and the page: open
//! a session, install cookies, scroll, harvest entries, click likes,
//! scrape soft signals. [`ChromiumDriver`] talks to a real browser over
//! DevTools; [`ScriptedDriver`] replays a scripted feed for tests and
//! dry runs.

pub mod chromium;
pub mod detect;
pub mod driver;
pub mod error;
pub mod model;
pub mod scripted;

pub use chromium::{ChromiumConfig, ChromiumDriver};
pub use detect::detect_chrome_executable;
pub use driver::FeedDriver;
pub use error::{DriverError, DriverErrorKind};
pub use model::{
    LikeAck, PageSignals, ScrollProbe, SiteProfile, StoredCookie, LOGIN_WALL_HINTS,
    RATE_LIMIT_HINTS,
};
pub use scripted::{ClickScript, ScriptedDriver};
