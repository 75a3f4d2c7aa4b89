//! Browser session used for sources that refuse scripted HTTP clients.

use crate::error::{HuntError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

/// A navigable page owned by the caller. Collectors borrow it mutably for the
/// duration of one call.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;
    async fn page_source(&mut self) -> Result<String>;

    /// Releases whatever the session holds. Nothing to do by default.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Chrome driven over the DevTools protocol.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    settle_ms: u64,
}

impl ChromeSession {
    /// `settle_ms` is waited after every navigation so scripted content can render.
    pub async fn launch(headless: bool, settle_ms: u64) -> Result<Self> {
        tracing::info!(headless, "Launching Chrome for browser-backed sources");

        let mut config = BrowserConfig::builder();
        if !headless {
            config = config.with_head();
        }
        config = config.no_sandbox().args(vec![
            "--disable-blink-features=AutomationControlled",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--window-size=1920,1080",
        ]);

        let config = config
            .build()
            .map_err(|e| HuntError::Browser(format!("Browser config error: {}", e)))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HuntError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HuntError::Browser(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            handler,
            settle_ms,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::debug!(url, "navigate");
        self.page
            .goto(url)
            .await
            .map_err(|e| HuntError::Browser(format!("navigation to {} failed: {}", url, e)))?;
        if self.settle_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.settle_ms)).await;
        }
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| HuntError::Browser(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| HuntError::Browser(e.to_string()));
        self.handler.abort();
        closed
    }
}
