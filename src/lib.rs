// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod metrics;
pub mod news;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;

pub use crate::api::{router, AppState};
pub use crate::config::CacheSettings;
pub use crate::news::{Aggregator, CacheManager, FeedFetcher, HttpFetcher};

/// Wire a cache manager from a registry, settings and a fetcher.
pub fn build_cache(
    sources: Vec<news::Source>,
    settings: &CacheSettings,
    fetcher: Arc<dyn FeedFetcher>,
) -> CacheManager {
    let aggregator = Aggregator::new(sources, fetcher, settings.refresh_timeout);
    CacheManager::new(aggregator, settings.ttl)
}

/// Build the full in-process app from env/config files, the same way the binary does.
pub async fn app() -> anyhow::Result<Router> {
    let sources = config::load_sources_default().context("loading news source registry")?;
    let settings = CacheSettings::from_env();
    let fetcher = HttpFetcher::new(settings.user_agent.clone(), settings.refresh_timeout)
        .context("building feed http client")?;

    info!(
        target: "news",
        sources = sources.len(),
        ttl_secs = settings.ttl.as_secs(),
        refresh_timeout_secs = settings.refresh_timeout.as_secs(),
        "news cache configured"
    );

    let state = AppState::new(build_cache(sources, &settings, Arc::new(fetcher)));
    if api::debug_routes_enabled() {
        let m = metrics::Metrics::init()?;
        return Ok(api::router_with_metrics(state, &m));
    }
    Ok(api::router(state))
}
