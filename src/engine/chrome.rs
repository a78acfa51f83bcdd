//! `headless_chrome`-backed session provider.

use super::{PageSession, SessionProvider};
use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;

/// Evaluated in page context. Stringified so the entry list comes back by
/// value rather than as a remote object reference.
const RESOURCE_TIMING_JS: &str =
    "JSON.stringify(window.performance.getEntries().map(e => [e.name, e.duration]))";

pub struct ChromeProvider {
    headless: bool,
}

impl ChromeProvider {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

impl SessionProvider for ChromeProvider {
    type Session = ChromeSession;

    /// Launch a fresh incognito chrome process with its own tab. No state
    /// (cookies, cache) is shared with sessions from earlier cycles.
    fn acquire(&self) -> Result<ChromeSession> {
        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .args(vec![OsStr::new("--incognito")])
            .build()
            .map_err(|e| anyhow!("build chrome launch options: {e}"))?;
        let browser = Browser::new(options).context("launch chrome")?;
        let tab = browser.new_tab().context("open tab")?;
        Ok(ChromeSession {
            _browser: browser,
            tab,
        })
    }
}

/// One browser process plus its tab. Dropping the session drops the
/// `Browser`, which kills the chrome process, so the release happens on
/// every exit path without explicit cleanup.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl PageSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .with_context(|| format!("navigate to {url}"))?;
        Ok(())
    }

    fn heading_text(&mut self, selector: &str) -> Result<String> {
        let element = self
            .tab
            .wait_for_element(selector)
            .with_context(|| format!("locate heading element {selector:?}"))?;
        element.get_inner_text().context("read heading text")
    }

    fn resource_entries(&mut self) -> Result<Vec<(String, f64)>> {
        let remote = self
            .tab
            .evaluate(RESOURCE_TIMING_JS, false)
            .context("evaluate resource timing script")?;
        let raw = remote
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("resource timing script returned no value"))?;
        serde_json::from_str(raw).context("parse resource timing entries")
    }
}
