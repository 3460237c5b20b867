//! Headless Chrome launch and the live-tab `PageContext`.
//!
//! Only one scrape may be in flight per process: launching a browser takes
//! the single permit and holds it until the `BrowserGuard` is dropped.
//!
//! Uses std::sync primitives because headless_chrome is blocking and runs
//! inside spawn_blocking.

use anyhow::{anyhow, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::BrowserConfig;
use crate::page::PageContext;

/// Concurrent scrapes allowed per process.
const MAX_BROWSER_INSTANCES: usize = 1;

static BROWSER_SEMAPHORE: once_cell::sync::Lazy<BrowserSemaphore> =
    once_cell::sync::Lazy::new(|| BrowserSemaphore::new(MAX_BROWSER_INSTANCES));

/// A counting semaphore that works in synchronous contexts.
struct BrowserSemaphore {
    state: std::sync::Mutex<usize>,
    condvar: std::sync::Condvar,
    max: usize,
}

impl BrowserSemaphore {
    fn new(max: usize) -> Self {
        Self {
            state: std::sync::Mutex::new(0),
            condvar: std::sync::Condvar::new(),
            max,
        }
    }

    /// Acquire a permit, blocking until one is available.
    fn acquire(&self) -> BrowserPermit<'_> {
        let mut count = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while *count >= self.max {
            count = self.condvar.wait(count).unwrap_or_else(|e| e.into_inner());
        }
        *count += 1;
        BrowserPermit { semaphore: self }
    }

    fn release(&self) {
        let mut count = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *count = count.saturating_sub(1);
        self.condvar.notify_one();
    }
}

/// RAII guard that releases a browser semaphore permit on drop.
struct BrowserPermit<'a> {
    semaphore: &'a BrowserSemaphore,
}

impl<'a> Drop for BrowserPermit<'a> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// A Chrome process plus the permit that allowed it to start.
/// Dropping the guard kills Chrome and frees the permit.
pub struct BrowserGuard {
    pub browser: Browser,
    _permit: BrowserPermit<'static>,
}

/// Running inside a container (detected via /.dockerenv or PLACESCRAPE_CONTAINER)?
fn is_container() -> bool {
    std::env::var("PLACESCRAPE_CONTAINER").is_ok() || Path::new("/.dockerenv").exists()
}

/// Chrome binary from CHROME_PATH, else let headless_chrome find one.
fn chrome_path() -> Option<PathBuf> {
    std::env::var("CHROME_PATH").ok().map(PathBuf::from)
}

/// Launch headless Chrome configured from `[browser]`, blocking until the
/// single scrape permit is free.
pub fn create_browser(config: &BrowserConfig) -> Result<BrowserGuard> {
    let permit = BROWSER_SEMAPHORE.acquire();

    // Chrome reads this flag from argv to hide `navigator.webdriver`.
    let args: Vec<&OsStr> = vec![OsStr::new("--disable-blink-features=AutomationControlled")];

    let options = LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(!is_container())
        .path(chrome_path())
        .window_size(Some((config.window_width, config.window_height)))
        .args(args)
        .build()
        .map_err(|e| anyhow!("Failed to build Chrome launch options: {}", e))?;

    let browser = Browser::new(options)
        .map_err(|e| anyhow!("Failed to launch headless Chrome: {}", e))?;

    Ok(BrowserGuard {
        browser,
        _permit: permit,
    })
}

/// A live Chrome tab. Owns the browser so the tab outlives every call.
pub struct ChromePage {
    tab: Arc<Tab>,
    url: String,
    _guard: BrowserGuard,
}

impl ChromePage {
    /// Launch Chrome, open `url` and wait `navigation_settle_ms` for the
    /// first batch of results to render.
    pub fn open(url: &str, config: &BrowserConfig) -> Result<Self> {
        let guard = create_browser(config)?;

        let tab = guard
            .browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create browser tab: {}", e))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;

        tab.navigate_to(url)
            .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;

        tab.wait_until_navigated()
            .map_err(|e| anyhow!("Page failed to load for {}: {}", url, e))?;

        debug!("Navigated to {}, settling for {}ms", url, config.navigation_settle_ms);
        std::thread::sleep(Duration::from_millis(config.navigation_settle_ms));

        Ok(Self {
            tab,
            url: url.to_string(),
            _guard: guard,
        })
    }

    fn evaluate_bool(&self, expression: &str) -> Result<bool> {
        let result = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| anyhow!("Script evaluation failed on {}: {}", self.url, e))?;
        Ok(result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

/// JSON-encode a selector so it can be embedded in a script literal.
fn js_string(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| anyhow!("Failed to encode selector: {}", e))
}

impl PageContext for ChromePage {
    fn has_element(&self, selector: &str) -> Result<bool> {
        let expression = format!("document.querySelector({}) !== null", js_string(selector)?);
        self.evaluate_bool(&expression)
    }

    fn scroll_element_to_end(&self, selector: &str) -> Result<bool> {
        let expression = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.scrollTo({{ top: el.scrollHeight, behavior: "smooth" }});
                return true;
            }})()"#,
            js_string(selector)?
        );
        self.evaluate_bool(&expression)
    }

    fn scroll_window_to_end(&self) -> Result<()> {
        self.tab
            .evaluate("window.scrollTo(0, document.body.scrollHeight)", false)
            .map_err(|e| anyhow!("Failed to scroll {}: {}", self.url, e))?;
        Ok(())
    }

    fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| anyhow!("Failed to get page content for {}: {}", self.url, e))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
