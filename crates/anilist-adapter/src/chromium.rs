//! Chromium-backed feed driver.
//!
//! Owns one browser, one page, and the DevTools event pump. All DOM
//! work happens through small JS snippets that return JSON strings;
//! the Rust side stays free of protocol details beyond launch and
//! cookie plumbing.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use anilike_core_types::{FeedItem, ItemId};

use crate::detect::{detect_chrome_executable, CHROME_ENV};
use crate::driver::FeedDriver;
use crate::error::DriverError;
use crate::model::{LikeAck, PageSignals, ScrollProbe, SiteProfile, StoredCookie};

/// Launch and timing knobs for the Chromium driver.
#[derive(Clone, Debug)]
pub struct ChromiumConfig {
    pub headless: bool,
    /// Explicit chrome binary; autodetected when absent.
    pub executable: Option<PathBuf>,
    /// Profile directory; ephemeral when absent.
    pub user_data_dir: Option<PathBuf>,
    pub window: (u32, u32),
    /// Upper bound for protocol requests, navigation included.
    pub nav_timeout: Duration,
    /// Pause after navigation or scroll so lazy content can land.
    pub settle: Duration,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            window: (1280, 1024),
            nav_timeout: Duration::from_secs(20),
            settle: Duration::from_millis(1200),
        }
    }
}

struct Session {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
}

/// [`FeedDriver`] implementation that runs a real Chromium.
pub struct ChromiumDriver {
    profile: SiteProfile,
    cfg: ChromiumConfig,
    session: Mutex<Option<Session>>,
}

#[derive(Deserialize)]
struct RawEntry {
    id: String,
    position: u64,
    liked: bool,
}

#[derive(Deserialize)]
struct RawSignals {
    text: String,
    wall: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdpCookie {
    name: String,
    value: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    http_only: bool,
    #[serde(default)]
    expires: Option<f64>,
    #[serde(default)]
    same_site: Option<String>,
}

impl ChromiumDriver {
    pub fn new(profile: SiteProfile, cfg: ChromiumConfig) -> Self {
        Self {
            profile,
            cfg,
            session: Mutex::new(None),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, DriverError> {
        let executable = match &self.cfg.executable {
            Some(path) => {
                if !path.exists() {
                    return Err(DriverError::launch(format!(
                        "chrome executable not found at {}",
                        path.display()
                    ))
                    .with_hint(format!(
                        "set {CHROME_ENV} to the full path of chrome/chromium"
                    )));
                }
                Some(path.clone())
            }
            None => detect_chrome_executable(),
        };

        let mut builder = BrowserConfig::builder()
            .request_timeout(self.cfg.nav_timeout)
            .launch_timeout(Duration::from_secs(20))
            .window_size(self.cfg.window.0, self.cfg.window.1);

        if !self.cfg.headless {
            builder = builder.with_head();
        }

        let mut args = vec![
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-blink-features=AutomationControlled",
            "--disable-breakpad",
            "--disable-component-update",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-hang-monitor",
            "--disable-popup-blocking",
            "--disable-prompt-on-repost",
            "--disable-sync",
            "--metrics-recording-only",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--use-mock-keychain",
        ];
        if self.cfg.headless {
            args.push("--headless=new");
            args.push("--hide-scrollbars");
            args.push("--mute-audio");
        }
        builder = builder.args(args);

        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }

        if let Some(dir) = &self.cfg.user_data_dir {
            std::fs::create_dir_all(dir).map_err(|err| {
                DriverError::io(format!(
                    "failed to ensure user-data-dir {}: {err}",
                    dir.display()
                ))
            })?;
            builder = builder.user_data_dir(dir);
        }

        builder.build().map_err(|err| {
            DriverError::launch(format!("browser config error: {err}"))
                .with_hint(format!("set {CHROME_ENV} to the full path of chrome/chromium"))
        })
    }

    /// CSS selector for the like affordance of one activity entry.
    fn like_selector(&self, id: &str) -> String {
        format!(
            "{}:has(a[href*='/activity/{}']) {}",
            self.profile.entry_selector, id, self.profile.like_button_selector
        )
    }

    fn scroll_js(&self, step_px: u32) -> String {
        let settle_ms = self.cfg.settle.as_millis();
        format!(
            r#"(async () => {{
                window.scrollBy(0, {step_px});
                await new Promise(resolve => setTimeout(resolve, {settle_ms}));
                const doc = document.documentElement;
                const body = document.body;
                const height = Math.max(doc.scrollHeight, body ? body.scrollHeight : 0);
                const offset = Math.round(window.scrollY);
                const at_bottom = offset + window.innerHeight >= height - 4;
                return JSON.stringify({{ offset, height, at_bottom }});
            }})()"#
        )
    }

    fn harvest_js(&self) -> String {
        format!(
            r#"(() => {{
                const out = [];
                const entries = document.querySelectorAll({entry:?});
                for (const el of entries) {{
                    const link = el.querySelector({link:?});
                    const href = link ? (link.getAttribute('href') || '') : '';
                    const match = href.match(/activity\/(\d+)/);
                    if (!match) continue;
                    const button = el.querySelector({like:?});
                    const liked = !!(button && button.classList.contains({liked:?}));
                    out.push({{ id: match[1], position: Number(match[1]), liked }});
                }}
                return JSON.stringify(out);
            }})()"#,
            entry = self.profile.entry_selector,
            link = self.profile.entry_link_selector,
            like = self.profile.like_button_selector,
            liked = self.profile.liked_class,
        )
    }

    fn signals_js(&self) -> String {
        format!(
            r#"(() => {{
                const body = document.body;
                const text = (body ? (body.innerText || '') : '').slice(0, 4000);
                const wall = !!document.querySelector({wall:?});
                return JSON.stringify({{ text, wall }});
            }})()"#,
            wall = self.profile.login_wall_selector,
        )
    }

    fn ack_js(&self, selector: &str) -> String {
        format!(
            r#"(() => {{
                const button = document.querySelector({selector:?});
                const applied = !!(button && button.classList.contains({liked:?}));
                return JSON.stringify({{ applied, already_liked: false }});
            }})()"#,
            liked = self.profile.liked_class,
        )
    }

    async fn eval_json<T: DeserializeOwned>(
        page: &Page,
        js: String,
        what: &str,
    ) -> Result<T, DriverError> {
        let raw: String = page
            .evaluate(js)
            .await
            .map_err(|err| DriverError::protocol(format!("{what}: {err}")))?
            .into_value()
            .map_err(|err| DriverError::protocol(format!("{what} returned no payload: {err}")))?;
        serde_json::from_str(&raw)
            .map_err(|err| DriverError::protocol(format!("{what} payload malformed: {err}")))
    }
}

#[async_trait]
impl FeedDriver for ChromiumDriver {
    async fn open(&self) -> Result<(), DriverError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            debug!(target: "driver", "chromium session already open");
            return Ok(());
        }

        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(|err| {
            DriverError::launch(err.to_string())
                .with_hint(format!("set {CHROME_ENV} to the full path of chrome/chromium"))
        })?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| DriverError::protocol(format!("failed to open page: {err}")))?;

        info!(
            target: "driver",
            headless = self.cfg.headless,
            "chromium session open"
        );
        *guard = Some(Session {
            browser,
            page,
            events,
        });
        Ok(())
    }

    async fn apply_cookies(&self, cookies: &[StoredCookie]) -> Result<(), DriverError> {
        if cookies.is_empty() {
            return Ok(());
        }
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("apply_cookies before open"))?;

        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            let mut builder = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .secure(cookie.secure)
                .http_only(cookie.http_only);
            if let Some(expires) = cookie.expires {
                builder = builder.expires(TimeSinceEpoch::new(expires));
            }
            if let Some(same_site) = &cookie.same_site {
                builder = match same_site.to_ascii_lowercase().as_str() {
                    "strict" => builder.same_site(CookieSameSite::Strict),
                    "lax" => builder.same_site(CookieSameSite::Lax),
                    "none" | "no_restriction" => builder.same_site(CookieSameSite::None),
                    other => {
                        debug!(target: "driver", same_site = other, "unrecognized same_site, skipped");
                        builder
                    }
                };
            }
            let param = builder.build().map_err(|err| {
                DriverError::internal(format!("cookie {} rejected: {err}", cookie.name))
            })?;
            params.push(param);
        }

        session
            .page
            .set_cookies(params)
            .await
            .map_err(|err| DriverError::protocol(format!("set_cookies failed: {err}")))?;
        debug!(target: "driver", count = cookies.len(), "cookies applied");
        Ok(())
    }

    async fn goto_feed(&self) -> Result<(), DriverError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("goto_feed before open"))?;

        session
            .page
            .goto(self.profile.feed_url.as_str())
            .await
            .map_err(|err| {
                DriverError::navigation(format!("goto {} failed: {err}", self.profile.feed_url))
            })?;
        tokio::time::sleep(self.cfg.settle).await;
        debug!(target: "driver", url = %self.profile.feed_url, "feed loaded");
        Ok(())
    }

    async fn logged_in(&self) -> Result<bool, DriverError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("logged_in before open"))?;

        let js = format!(
            "JSON.stringify(!!document.querySelector({:?}))",
            self.profile.logged_in_selector
        );
        Self::eval_json::<bool>(&session.page, js, "logged_in probe").await
    }

    async fn scroll_feed(&self, step_px: u32) -> Result<ScrollProbe, DriverError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("scroll_feed before open"))?;

        Self::eval_json::<ScrollProbe>(&session.page, self.scroll_js(step_px), "scroll probe").await
    }

    async fn visible_entries(&self) -> Result<Vec<FeedItem>, DriverError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("visible_entries before open"))?;

        let raw: Vec<RawEntry> =
            Self::eval_json(&session.page, self.harvest_js(), "entry harvest").await?;
        Ok(raw
            .into_iter()
            .map(|entry| FeedItem::new(ItemId::from(entry.id), entry.position, entry.liked))
            .collect())
    }

    async fn click_like(&self, item: &ItemId) -> Result<LikeAck, DriverError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("click_like before open"))?;

        let selector = self.like_selector(item.as_str());
        let element = session
            .page
            .find_element(selector.as_str())
            .await
            .map_err(|err| {
                DriverError::not_found(format!("like control for {item} not present: {err}"))
            })?;
        element
            .click()
            .await
            .map_err(|err| DriverError::protocol(format!("click on {item} failed: {err}")))?;

        // Let the SPA commit the toggle before reading it back.
        tokio::time::sleep(Duration::from_millis(350)).await;
        let ack: LikeAck =
            Self::eval_json(&session.page, self.ack_js(&selector), "like readback").await?;
        if !ack.applied {
            warn!(target: "driver", item = %item, "click dispatched but affordance did not toggle");
        }
        Ok(ack)
    }

    async fn page_signals(&self) -> Result<PageSignals, DriverError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("page_signals before open"))?;

        let raw: RawSignals =
            Self::eval_json(&session.page, self.signals_js(), "signal scan").await?;
        Ok(PageSignals::from_scan(&raw.text, raw.wall))
    }

    async fn export_cookies(&self) -> Result<Vec<StoredCookie>, DriverError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| DriverError::internal("export_cookies before open"))?;

        let cookies = session
            .page
            .get_cookies()
            .await
            .map_err(|err| DriverError::protocol(format!("get_cookies failed: {err}")))?;
        let value = serde_json::to_value(&cookies)
            .map_err(|err| DriverError::internal(format!("cookie encode failed: {err}")))?;
        let wire: Vec<CdpCookie> = serde_json::from_value(value)
            .map_err(|err| DriverError::internal(format!("cookie decode failed: {err}")))?;

        Ok(wire
            .into_iter()
            .map(|cookie| StoredCookie {
                name: cookie.name,
                value: cookie.value,
                domain: cookie.domain,
                path: cookie.path,
                secure: cookie.secure,
                http_only: cookie.http_only,
                // CDP reports session cookies as a negative epoch.
                expires: cookie.expires.filter(|at| *at > 0.0),
                same_site: cookie.same_site,
            })
            .collect())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            if let Err(err) = session.browser.close().await {
                debug!(target: "driver", error = %err, "browser close reported an error");
            }
            session.events.abort();
            info!(target: "driver", "chromium session closed");
        }
        Ok(())
    }
}
