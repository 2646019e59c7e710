//! Headless Chrome session and the live-tab [`DocumentScope`].

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use crate::config::CrawlerConfig;
use crate::error::{CrawlError, Result};
use crate::frame::{locate_search_frame, parse_frame_list, LIST_FRAMES_JS};
use crate::scope::{parse_selector, DocumentScope};
use crate::stealth;

/// Scrolls the window and the result list container, which scrolls on its own.
const SCROLL_TO_BOTTOM_JS: &str = r#"
    (() => {
        const list = document.querySelector('#_pcmap_list_scroll_container');
        if (list) { list.scrollTop = list.scrollHeight; }
        window.scrollTo(0, document.body.scrollHeight);
        return true;
    })()
"#;

/// One Chrome process with a main tab. Owned by a single run; call
/// [`BrowserSession::close`] when the run ends, successful or not.
pub struct BrowserSession {
    browser: Browser,
    main_tab: Arc<Tab>,
    navigation_timeout: Duration,
}

impl BrowserSession {
    pub fn launch(config: &CrawlerConfig) -> Result<Self> {
        let user_agent = stealth::random_user_agent();
        debug!("Using User-Agent: {}", user_agent);

        let mut args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--lang=ko-KR"),
        ];
        let ua_arg = format!("--user-agent={}", user_agent);
        args.push(OsStr::new(&ua_arg));
        if config.headless {
            args.push(OsStr::new("--headless=new"));
        }

        info!("🚀 launching Chrome (headless: {})", config.headless);
        let browser = Browser::new(LaunchOptions {
            // Headless mode is selected through --headless=new above.
            headless: false,
            window_size: Some((1920, 1080)),
            idle_browser_timeout: config.navigation_timeout * 4,
            args,
            ..Default::default()
        })?;

        let main_tab = browser.new_tab()?;
        main_tab.set_default_timeout(config.navigation_timeout);
        stealth::harden_tab(&main_tab)?;

        Ok(Self {
            browser,
            main_tab,
            navigation_timeout: config.navigation_timeout,
        })
    }

    pub fn main_tab(&self) -> &Arc<Tab> {
        &self.main_tab
    }

    pub fn navigate(&self, tab: &Arc<Tab>, url: &str) -> Result<()> {
        tab.navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Opens `url` in a fresh hardened tab.
    pub fn open_tab(&self, url: &str) -> Result<Arc<Tab>> {
        let tab = self.browser.new_tab()?;
        tab.set_default_timeout(self.navigation_timeout);
        stealth::harden_tab(&tab)?;
        self.navigate(&tab, url)?;
        Ok(tab)
    }

    /// Finds the search sub-frame on the main tab and opens it as its own
    /// scope. The frame is cross-origin, so it is loaded from its `src`.
    pub fn open_search_frame(&self, wait: Duration) -> Result<ChromeScope> {
        let main = ChromeScope::new(self.main_tab.clone());
        if !main.wait_for("iframe", wait) {
            warn!("no iframe appeared within {:?}", wait);
        }

        let listing = self
            .main_tab
            .evaluate(LIST_FRAMES_JS, false)?
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "[]".to_string());
        let frames = parse_frame_list(&listing)?;
        debug!("page has {} frames", frames.len());

        let (how, frame) = locate_search_frame(&frames).ok_or(CrawlError::FrameNotFound {
            frames: frames.len(),
        })?;
        info!("✓ search frame found by {}: {}", how, frame.src);

        let tab = self.open_tab(&frame.src)?;
        Ok(ChromeScope::new(tab))
    }

    /// Closes every tab and shuts the browser down.
    pub fn close(self) {
        let tabs = match self.browser.get_tabs().lock() {
            Ok(tabs) => tabs.clone(),
            Err(_) => Vec::new(),
        };
        for tab in tabs {
            if let Err(e) = tab.close(false) {
                debug!("closing tab failed: {}", e);
            }
        }
        info!("🛑 browser closed");
    }
}

/// A live tab viewed through [`DocumentScope`].
#[derive(Clone)]
pub struct ChromeScope {
    tab: Arc<Tab>,
}

impl ChromeScope {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    /// Closes the tab behind this scope. The main tab is left to the session.
    pub fn close(self) {
        if let Err(e) = self.tab.close(false) {
            debug!("closing frame tab failed: {}", e);
        }
    }
}

impl DocumentScope for ChromeScope {
    fn wait_for(&self, selector: &str, timeout: Duration) -> bool {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .is_ok()
    }

    fn count(&self, selector: &str) -> Result<usize> {
        parse_selector(selector)?;
        let js = format!(
            "document.querySelectorAll({}).length",
            serde_json::to_string(selector)?
        );
        let count = self
            .tab
            .evaluate(&js, false)?
            .value
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(count as usize)
    }

    fn scroll_to_bottom(&self) -> Result<()> {
        self.tab.evaluate(SCROLL_TO_BOTTOM_JS, false)?;
        Ok(())
    }

    fn html(&self) -> Result<String> {
        Ok(self.tab.get_content()?)
    }
}
