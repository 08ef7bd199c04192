//! Cookie-based session handling.
//!
//! AniList has no credential login here: the user exports cookies from
//! a logged-in browser, and this module loads them, filters what has
//! already expired, proves they still authenticate, and writes the
//! site's refreshed values back after a run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use anilike_engine::SessionAuth;
use anilike_like_ledger::write_atomic;
use anilist_adapter::{DriverError, FeedDriver, StoredCookie};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("cookie file {} does not exist; export cookies from a logged-in browser first", .0.display())]
    Missing(PathBuf),
    #[error("cookie file {} is not a JSON cookie array: {}", .path.display(), .detail)]
    Malformed { path: PathBuf, detail: String },
    #[error("every cookie in {} has expired; export a fresh set", .0.display())]
    Expired(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Cookies loaded from disk, expiry-filtered, ready to apply.
#[derive(Debug)]
pub struct CookieSession {
    path: PathBuf,
    cookies: Vec<StoredCookie>,
}

impl CookieSession {
    /// Read and screen the cookie file. Fails before any browser is
    /// launched, so a bad file costs nothing.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        if !path.exists() {
            return Err(AuthError::Missing(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let all: Vec<StoredCookie> =
            serde_json::from_str(&raw).map_err(|err| AuthError::Malformed {
                path: path.to_path_buf(),
                detail: err.to_string(),
            })?;

        let now = Utc::now().timestamp() as f64;
        let total = all.len();
        let cookies: Vec<StoredCookie> = all
            .into_iter()
            .filter(|cookie| !cookie.expired(now))
            .collect();
        let dropped = total - cookies.len();
        if dropped > 0 {
            warn!(target: "auth", dropped, "expired cookies ignored");
        }
        if cookies.is_empty() {
            return Err(AuthError::Expired(path.to_path_buf()));
        }

        info!(
            target: "auth",
            path = %path.display(),
            count = cookies.len(),
            "cookie session loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            cookies,
        })
    }

    pub fn cookies(&self) -> &[StoredCookie] {
        &self.cookies
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Atomically rewrite the cookie file. The site rotates cookie values
/// mid-session, so the export after a good run keeps the file current.
pub fn persist_cookies(path: &Path, cookies: &[StoredCookie]) -> Result<(), AuthError> {
    let body = serde_json::to_vec_pretty(cookies).map_err(|err| AuthError::Malformed {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    write_atomic(path, &body)?;
    debug!(
        target: "auth",
        path = %path.display(),
        count = cookies.len(),
        "cookies persisted"
    );
    Ok(())
}

/// [`SessionAuth`] backed by the stored cookies: re-applies them,
/// reloads the feed, and checks the logged-in marker.
pub struct CookieAuth<D> {
    driver: D,
    cookies: Vec<StoredCookie>,
}

impl<D> CookieAuth<D> {
    pub fn new(driver: D, cookies: Vec<StoredCookie>) -> Self {
        Self { driver, cookies }
    }
}

#[async_trait]
impl<D> SessionAuth for CookieAuth<D>
where
    D: FeedDriver,
{
    async fn validate(&self) -> Result<bool, DriverError> {
        self.driver.apply_cookies(&self.cookies).await?;
        self.driver.goto_feed().await?;
        let ok = self.driver.logged_in().await?;
        if ok {
            debug!(target: "auth", "session cookies accepted");
        } else {
            warn!(target: "auth", "login marker absent after applying cookies");
        }
        Ok(ok)
    }
}
