use crate::{Renderer, WatcherError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

pub const RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Renders pages in a throwaway headless Chromium.
///
/// Every call launches its own browser and closes it before returning, on
/// success, on load failure and on timeout alike.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    timeout: Duration,
    sandbox: bool,
}

impl Default for ChromiumRenderer {
    fn default() -> Self {
        ChromiumRenderer {
            timeout: RENDER_TIMEOUT,
            sandbox: true,
        }
    }
}

impl ChromiumRenderer {
    pub fn with_timeout(timeout: Duration) -> ChromiumRenderer {
        ChromiumRenderer {
            timeout,
            ..ChromiumRenderer::default()
        }
    }

    /// Chromium refuses to start sandboxed as root, which is common in containers.
    pub fn without_sandbox(mut self) -> ChromiumRenderer {
        self.sandbox = false;
        self
    }

    fn browser_config(&self) -> Result<BrowserConfig, WatcherError> {
        let mut builder = BrowserConfig::builder();
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        builder.build().map_err(WatcherError::BrowserError)
    }
}

/// Tracks main-frame lifecycle events until the navigated document goes network idle.
#[derive(Debug, Default)]
struct IdleWatch {
    navigated: bool,
}

impl IdleWatch {
    /// Returns true once the new document has settled.
    fn observe(&mut self, name: &str) -> bool {
        match name {
            "init" => {
                self.navigated = true;
                false
            }
            "networkIdle" => self.navigated,
            _ => false,
        }
    }
}

async fn load(browser: &Browser, url: &str) -> Result<String, CdpError> {
    let page = browser.new_page("about:blank").await?;
    let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;
    page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
    let main_frame = page.mainframe().await?;

    let navigation = page.execute(NavigateParams::new(url)).await?;
    if let Some(error) = navigation.result.error_text.clone() {
        return Err(CdpError::ChromeMessage(error));
    }

    let mut idle = IdleWatch::default();
    while let Some(event) = lifecycle.next().await {
        if let Some(frame) = main_frame.as_ref() {
            if frame != &event.frame_id {
                continue;
            }
        }
        if idle.observe(&event.name) {
            break;
        }
    }

    let html = page.content().await?;
    page.close().await?;
    Ok(html)
}

#[async_trait::async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<String, WatcherError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| WatcherError::BrowserError(e.to_string()))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("Render {}", url);
        let loaded = tokio::time::timeout(self.timeout, load(&browser, url)).await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser after {}: {}", url, e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Failed to reap browser process after {}: {}", url, e);
        }
        events.abort();

        match loaded {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(WatcherError::RenderError {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(WatcherError::RenderError {
                url: url.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            }),
        }
    }
}
