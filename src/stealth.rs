//! Browser hardening and human-paced input.
//!
//! The map site serves a degraded page to obvious automation, so every tab
//! gets the init script below, a Korean locale and timezone, and typed input
//! with jittered keystroke timing.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Emulation::{SetLocaleOverride, SetTimezoneOverride};
use headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument;
use headless_chrome::Tab;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::sleep;

use crate::error::Result;

pub const TIMEZONE: &str = "Asia/Seoul";
pub const LOCALE: &str = "ko-KR";

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        FALLBACK_USER_AGENT,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    ]
});

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_USER_AGENT)
}

/// Init script injected before any page script runs.
pub fn stealth_script() -> String {
    r#"
        // webdriver flag
        Object.defineProperty(navigator, 'webdriver', {
            get: () => undefined,
        });

        Object.defineProperty(navigator, 'languages', {
            get: () => ['ko-KR', 'ko', 'en-US', 'en'],
        });

        Object.defineProperty(navigator, 'plugins', {
            get: () => {
                const pdf = {
                    0: { type: "application/x-google-chrome-pdf", suffixes: "pdf", description: "Portable Document Format" },
                    description: "Portable Document Format",
                    filename: "internal-pdf-viewer",
                    length: 1,
                    name: "Chrome PDF Plugin"
                };
                const p = [pdf, pdf, pdf];
                Object.setPrototypeOf(p, PluginArray.prototype);
                return p;
            }
        });

        // headless Chrome ships without window.chrome
        window.chrome = {
            runtime: {},
            csi: function() {},
            loadTimes: function() { return {}; }
        };

        const originalQuery = window.navigator.permissions.query;
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications' ?
            Promise.resolve({ state: Notification.permission }) :
            originalQuery(parameters)
        );
    "#
    .to_string()
}

/// Registers the init script and the Korean locale/timezone on `tab`.
pub fn harden_tab(tab: &Arc<Tab>) -> Result<()> {
    tab.call_method(AddScriptToEvaluateOnNewDocument {
        source: stealth_script(),
        world_name: None,
        include_command_line_api: None,
        run_immediately: None,
    })?;
    apply_locale_settings(tab, TIMEZONE, LOCALE)
}

pub fn apply_locale_settings(tab: &Arc<Tab>, timezone_id: &str, locale: &str) -> Result<()> {
    tab.call_method(SetTimezoneOverride {
        timezone_id: timezone_id.to_string(),
    })?;
    tab.call_method(SetLocaleOverride {
        locale: Some(locale.to_string()),
    })?;
    Ok(())
}

pub fn jitter(range_ms: Range<u64>) -> Duration {
    if range_ms.is_empty() {
        return Duration::from_millis(range_ms.start);
    }
    Duration::from_millis(rand::thread_rng().gen_range(range_ms))
}

/// Types `text` into the focused element one character at a time.
pub async fn type_like_human(tab: &Arc<Tab>, text: &str) -> Result<()> {
    for ch in text.chars() {
        tab.type_str(&ch.to_string())?;
        sleep(jitter(50..150)).await;
    }
    Ok(())
}
