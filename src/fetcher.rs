use crate::{Fetch, Renderer, WatcherError};
use std::time::Duration;
use tracing::{debug, info};

pub const USER_AGENT: &str = "job-watcher-bot";
pub const DIRECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why the plain HTTP attempt was abandoned in favour of rendering.
#[derive(Debug, thiserror::Error)]
pub enum FallbackReason {
    #[error("status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(reqwest::Error),
}

#[derive(Debug)]
pub enum DirectFetch {
    Page(String),
    Fallback(FallbackReason),
}

/// Static fetch with a browser-rendered fallback.
pub struct Fetcher<R> {
    client: reqwest::Client,
    renderer: R,
}

impl<R: Renderer + Send + Sync> Fetcher<R> {
    pub fn new(renderer: R) -> Result<Fetcher<R>, WatcherError> {
        let client = reqwest::Client::builder()
            .timeout(DIRECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Fetcher { client, renderer })
    }

    pub async fn fetch_direct(&self, url: &str) -> DirectFetch {
        debug!("Visit {}", url);
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return DirectFetch::Fallback(FallbackReason::Request(e)),
        };

        let status = response.status();
        if !status.is_success() {
            return DirectFetch::Fallback(FallbackReason::Status(status.as_u16()));
        }

        match response.text().await {
            Ok(html) => DirectFetch::Page(html),
            Err(e) => DirectFetch::Fallback(FallbackReason::Request(e)),
        }
    }
}

#[async_trait::async_trait]
impl<R: Renderer + Send + Sync> Fetch for Fetcher<R> {
    async fn fetch(&self, url: &str) -> Result<String, WatcherError> {
        match self.fetch_direct(url).await {
            DirectFetch::Page(html) => Ok(html),
            DirectFetch::Fallback(reason) => {
                info!("Direct fetch of {} failed ({}), rendering", url, reason);
                self.renderer.render(url).await
            }
        }
    }
}
