// src/news/fetcher.rs
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;

use crate::news::types::{Source, SourceError};

/// Accept header favouring RSS/XML payloads.
pub const FEED_ACCEPT: &str =
    "application/rss+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.7";

pub const DEFAULT_USER_AGENT: &str = "NewsAggregator/1.0";

/// One outbound read per call. Implementations must not retry; the next
/// scheduled refresh is the retry.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<String, SourceError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> Result<String, SourceError> {
        let ua = source.user_agent.as_deref().unwrap_or(&self.user_agent);
        tracing::debug!(target: "news", source = %source.id, url = %source.url, "fetching feed");

        let resp = self
            .client
            .get(&source.url)
            .header(USER_AGENT, ua)
            .header(ACCEPT, FEED_ACCEPT)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                source_id: source.id.clone(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                source_id: source.id.clone(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| SourceError::Transport {
            source_id: source.id.clone(),
            message: format!("reading body: {e}"),
        })
    }
}
