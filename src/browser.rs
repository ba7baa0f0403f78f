// src/browser.rs
//
// Thin wrapper over headless_chrome. One BrowserSession per run; every page
// lives in its own incognito context so tabs never share cookies or
// navigation state.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::scraper::discovery::ScrollSurface;
use crate::scraper::ScraperError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const VIEWPORT: (u32, u32) = (1920, 1080);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    pub fn launch() -> Result<Self, ScraperError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some(VIEWPORT))
            .idle_browser_timeout(IDLE_TIMEOUT)
            .build()
            .map_err(|e| ScraperError::Browser(format!("bad launch options: {e}")))?;
        let browser = Browser::new(options)
            .map_err(|e| ScraperError::Browser(format!("failed to launch browser: {e}")))?;
        Ok(BrowserSession { browser })
    }

    /// New tab in a fresh incognito context. The context handle is dropped
    /// once the tab exists; the tab stays valid until closed.
    pub fn open_page(&self) -> Result<PageHandle, ScraperError> {
        let context = self
            .browser
            .new_context()
            .map_err(|e| ScraperError::Browser(format!("failed to create context: {e}")))?;
        let tab = context
            .new_tab()
            .map_err(|e| ScraperError::Browser(format!("failed to open tab: {e}")))?;
        tab.set_user_agent(USER_AGENT, None, None)
            .map_err(|e| ScraperError::Browser(format!("failed to set user agent: {e}")))?;
        tab.set_default_timeout(NAVIGATION_TIMEOUT);
        Ok(PageHandle { tab })
    }
}

pub struct PageHandle {
    tab: Arc<Tab>,
}

impl PageHandle {
    pub fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| ScraperError::Navigation(format!("failed to load {url}: {e}")))?;
        Ok(())
    }

    pub fn content(&self) -> Result<String, ScraperError> {
        self.tab
            .get_content()
            .map_err(|e| ScraperError::Browser(format!("failed to read page content: {e}")))
    }

    pub fn wait(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }

    pub fn close(self) {
        let _ = self.tab.close(true);
    }

    fn eval(&self, expr: &str) -> Result<Option<serde_json::Value>, ScraperError> {
        let result = self
            .tab
            .evaluate(expr, false)
            .map_err(|e| ScraperError::Browser(format!("evaluate failed ({expr}): {e}")))?;
        Ok(result.value)
    }

    fn eval_number(&self, expr: &str) -> Result<i64, ScraperError> {
        match self.eval(expr)? {
            Some(serde_json::Value::Number(n)) => Ok(n.as_f64().unwrap_or(0.0) as i64),
            other => Err(ScraperError::Browser(format!(
                "expected number from {expr}, got {other:?}"
            ))),
        }
    }
}

impl ScrollSurface for PageHandle {
    fn scroll_to(&self, y: i64) -> Result<(), ScraperError> {
        self.eval(&format!("window.scrollTo(0, {y})"))?;
        Ok(())
    }

    fn scroll_by(&self, delta: i64) -> Result<(), ScraperError> {
        self.eval(&format!("window.scrollBy(0, {delta})"))?;
        Ok(())
    }

    fn scroll_to_bottom(&self) -> Result<(), ScraperError> {
        self.eval("window.scrollTo(0, document.body.scrollHeight)")?;
        Ok(())
    }

    fn scroll_height(&self) -> Result<i64, ScraperError> {
        self.eval_number(
            "Math.max(document.body.scrollHeight, document.documentElement.scrollHeight)",
        )
    }

    fn scroll_offset(&self) -> Result<i64, ScraperError> {
        self.eval_number("Math.round(window.pageYOffset)")
    }

    fn visible_text(&self) -> Result<String, ScraperError> {
        match self.eval("document.body.innerText")? {
            Some(serde_json::Value::String(s)) => Ok(s),
            _ => Ok(String::new()),
        }
    }

    fn snapshot(&self) -> Result<String, ScraperError> {
        self.content()
    }

    fn settle(&self, ms: u64) {
        self.wait(ms);
    }
}
