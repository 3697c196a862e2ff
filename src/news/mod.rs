// src/news/mod.rs
pub mod aggregator;
pub mod cache;
pub mod fetcher;
pub mod normalize;
pub mod query;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use aggregator::Aggregator;
pub use cache::CacheManager;
pub use fetcher::{FeedFetcher, HttpFetcher};
pub use types::{CacheSnapshot, NewsItem, Region, Source, SourceError, Topic};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_refresh_total", "Aggregation passes run.");
        describe_histogram!("news_refresh_ms", "Wall time of one aggregation pass in milliseconds.");
        describe_histogram!("news_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!(
            "news_source_failures_total",
            "Per-source fetch/parse/timeout failures."
        );
        describe_counter!(
            "news_items_dropped_total",
            "Feed entries dropped during normalization (missing title/url, over cap)."
        );
        describe_counter!("news_cache_hits_total", "Requests served without a refresh.");
        describe_counter!("news_cache_misses_total", "Requests that ran a refresh.");
        describe_gauge!("news_cache_items", "Items in the installed snapshot.");
        describe_gauge!("news_cache_ttl_seconds", "Configured snapshot TTL.");
    });
}
