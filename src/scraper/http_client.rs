use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use super::error::CrawlError;
use super::state::StatePayload;

/// Request/response seam between the crawler and the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<String, CrawlError>;
    async fn post(&self, url: &Url, payload: &StatePayload) -> Result<String, CrawlError>;
}

/// One portal session. The cookie jar lives and dies with this value, so
/// every crawl gets a fresh session and nothing leaks between crawls.
pub struct HttpClient {
    inner: reqwest::Client,
    delay: Duration,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // ASP.NET_SessionId binds the postback state to this client
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    /// Fixed pause between requests. There is no retry path: a resubmitted
    /// payload is stale by definition once the server has answered it.
    async fn polite_delay(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    async fn read_body(
        method: &'static str,
        url: &Url,
        sent: reqwest::Result<reqwest::Response>,
    ) -> Result<String, CrawlError> {
        let network = |source| CrawlError::Network {
            method,
            url: url.to_string(),
            source,
        };

        let resp = sent.and_then(|r| r.error_for_status()).map_err(network)?;
        debug!("{} {} -> {}", method, url, resp.status());
        resp.text().await.map_err(network)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url: &Url) -> Result<String, CrawlError> {
        self.polite_delay().await;
        let sent = self.inner.get(url.clone()).send().await;
        Self::read_body("GET", url, sent).await
    }

    async fn post(&self, url: &Url, payload: &StatePayload) -> Result<String, CrawlError> {
        self.polite_delay().await;
        let sent = self
            .inner
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(payload.encode())
            .send()
            .await;
        Self::read_body("POST", url, sent).await
    }
}
