//! Rendered-page access for the profile checker.
//!
//! The checker only needs two things from a browser: navigate somewhere and
//! hand back the markup as rendered after client-side scripts ran.
//! [`ChromeSession`] provides that over the Chrome DevTools Protocol.

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use log::{info, warn};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{CheckerError, Result};

/// A browser-like source of rendered pages.
#[async_trait]
pub trait PageSource: Send {
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// Markup of the current page as rendered right now.
    async fn content(&mut self) -> Result<String>;

    /// Releases the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// One Chromium process with a single working tab, held for a whole batch.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    closed: bool,
}

impl ChromeSession {
    pub async fn launch(headless: bool) -> Result<Self> {
        let builder = BrowserConfig::builder();
        let builder = if headless { builder } else { builder.with_head() };
        let config = builder
            .build()
            .map_err(|e| CheckerError::Browser(format!("failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CheckerError::Browser(format!("failed to launch browser: {}", e)))?;

        // The handler drives the CDP connection and must be polled for the browser to respond.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser handler event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(CheckerError::Browser(format!("failed to open tab: {}", e)));
            }
        };

        info!("Browser session started (headless: {})", headless);
        Ok(ChromeSession { browser, page, handler_task, closed: false })
    }
}

#[async_trait]
impl PageSource for ChromeSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| CheckerError::Browser(format!("navigation to {} failed: {}", url, e)))?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| CheckerError::Browser(format!("could not read page: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        info!("Browser session closed");

        result
            .map(|_| ())
            .map_err(|e| CheckerError::Browser(format!("failed to close browser: {}", e)))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if !self.closed {
            // chromiumoxide kills the child process when the Browser is dropped.
            warn!("Browser session dropped without close, killing browser");
            self.handler_task.abort();
        }
    }
}
