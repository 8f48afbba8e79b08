use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;

const USER_AGENT: &str = "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The operator may spend minutes on a challenge; the browser must outlive that
const IDLE_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

const MASK_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined }); true";

/// Title, address and markup of the current page at one point in time
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub title: String,
    pub url: String,
    pub html: String,
}

/// Browser operations the crawl needs. Implemented by [`ChromeDriver`] and by
/// in-memory fakes in tests.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn snapshot(&self) -> Result<PageSnapshot>;

    async fn wait_for_body(&self, timeout: Duration) -> Result<()>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    async fn scroll_by(&self, pixels: i64) -> Result<()>;

    /// Click the first visible element matched by any XPath, in order.
    /// Returns the XPath that matched.
    async fn click_first_visible(&self, xpaths: &[&str]) -> Result<Option<String>>;

    /// Copy `data-src` into `src` for lazily loaded images
    async fn reveal_lazy_images(&self) -> Result<usize>;

    async fn save_screenshot(&self, path: &Path) -> Result<()>;
}

/// A visible Chrome window driven over the DevTools protocol
pub struct ChromeDriver {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    pub fn launch(config: &Config) -> Result<Self> {
        let mut builder = LaunchOptionsBuilder::default();
        builder
            .headless(config.headless)
            .window_size(Some((1366, 900)))
            .sandbox(false)
            .idle_browser_timeout(IDLE_TIMEOUT)
            .ignore_default_args(vec![OsStr::new("--enable-automation")])
            .args(vec![
                OsStr::new("--start-maximized"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-gpu"),
                OsStr::new(USER_AGENT),
            ]);
        if let Some(path) = &config.chrome_path {
            builder.path(Some(path.clone()));
        }

        let browser = Browser::new(builder.build().context("Invalid Chrome launch options")?)
            .context("Failed to start Chrome")?;
        let tab = browser.new_tab().context("Failed to open a browser tab")?;

        if let Some(pid) = browser.get_process_id() {
            debug!("Browser process ID: {}", pid);
        }
        info!("Chrome started (headless: {})", config.headless);

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn eval(&self, script: &str) -> Result<Option<Value>> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| anyhow!("Script evaluation failed: {}", e))?;
        Ok(result.value)
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?
            .wait_until_navigated()
            .with_context(|| format!("Navigation to {} did not finish", url))?;

        if let Err(e) = self.eval(MASK_WEBDRIVER) {
            warn!("Could not mask navigator.webdriver: {}", e);
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(PageSnapshot {
            title: self.tab.get_title().unwrap_or_default(),
            url: self.tab.get_url(),
            html: self.tab.get_content().context("Failed to get page content")?,
        })
    }

    async fn wait_for_body(&self, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout("body", timeout)
            .map_err(|e| anyhow!("Failed to wait for page body: {}", e))?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.eval("window.scrollTo({ top: document.body.scrollHeight, behavior: 'smooth' }); true")?;
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<()> {
        self.eval(&format!(
            "window.scrollBy({{ top: {}, behavior: 'smooth' }}); true",
            pixels
        ))?;
        Ok(())
    }

    async fn click_first_visible(&self, xpaths: &[&str]) -> Result<Option<String>> {
        let list = serde_json::to_string(xpaths)?;
        let script = format!(
            r#"(() => {{
                for (const xp of {list}) {{
                    const found = document.evaluate(xp, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                    for (let i = 0; i < found.snapshotLength; i++) {{
                        const el = found.snapshotItem(i);
                        if (el && el.offsetParent !== null) {{
                            el.scrollIntoView({{ block: 'center' }});
                            el.click();
                            return xp;
                        }}
                    }}
                }}
                return null;
            }})()"#
        );
        Ok(self
            .eval(&script)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn reveal_lazy_images(&self) -> Result<usize> {
        let revealed = self.eval(
            "(() => { let n = 0; document.querySelectorAll('img[loading=\"lazy\"]').forEach(img => { if (img.dataset.src) { img.src = img.dataset.src; n++; } }); return n; })()",
        )?;
        Ok(revealed.and_then(|v| v.as_u64()).unwrap_or(0) as usize)
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .context("Failed to capture screenshot")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, png)
            .with_context(|| format!("Failed to write screenshot {}", path.display()))?;
        Ok(())
    }
}
