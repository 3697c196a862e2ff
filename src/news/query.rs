// src/news/query.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::news::types::{CacheSnapshot, NewsItem, Source};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 150;

/// Raw query-string parameters, all optional and read leniently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsQueryParams {
    pub q: Option<String>,
    pub region: Option<String>,
    pub topic: Option<String>,
    pub limit: Option<String>,
}

/// Validated request filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    /// Lowercased free-text needle.
    pub text: Option<String>,
    /// Exact region name; `None` means all.
    pub region: Option<String>,
    /// Topic tag; `None` means all.
    pub topic: Option<String>,
    pub limit: usize,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            text: None,
            region: None,
            topic: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl From<NewsQueryParams> for NewsQuery {
    fn from(p: NewsQueryParams) -> Self {
        Self {
            text: p
                .q
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            region: all_or_value(p.region),
            topic: all_or_value(p.topic),
            limit: parse_limit(p.limit.as_deref()),
        }
    }
}

fn all_or_value(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "all")
}

/// Missing, non-numeric or zero → default; otherwise clamped to `1..=MAX_LIMIT`.
pub fn parse_limit(raw: Option<&str>) -> usize {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        None | Some(0) => DEFAULT_LIMIT,
        Some(n) => n.clamp(1, MAX_LIMIT as i64) as usize,
    }
}

/// Filter a read-only snapshot view; the snapshot itself is never touched.
pub fn filter_items<'a>(items: &'a [NewsItem], q: &NewsQuery) -> Vec<&'a NewsItem> {
    items
        .iter()
        .filter(|it| q.region.as_deref().map_or(true, |r| it.region.as_str() == r))
        .filter(|it| {
            q.topic
                .as_deref()
                .map_or(true, |t| it.tags.iter().any(|tag| tag.as_str() == t))
        })
        .filter(|it| q.text.as_deref().map_or(true, |needle| matches_text(it, needle)))
        .take(q.limit.clamp(1, MAX_LIMIT))
        .collect()
}

fn matches_text(it: &NewsItem, needle: &str) -> bool {
    let hay = format!(
        "{} {} {}",
        it.title,
        it.snippet.as_deref().unwrap_or_default(),
        it.source
    )
    .to_lowercase();
    hay.contains(needle)
}

/// JSON body returned by `GET /api/news`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub updated_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub total: usize,
    pub sources: Vec<Source>,
    pub failures: BTreeMap<String, String>,
    pub items: Vec<NewsItem>,
}

pub fn build_response(
    snapshot: &CacheSnapshot,
    sources: &[Source],
    ttl: Duration,
    q: &NewsQuery,
) -> NewsResponse {
    let items: Vec<NewsItem> = filter_items(&snapshot.items, q)
        .into_iter()
        .cloned()
        .collect();
    NewsResponse {
        updated_at: snapshot.generated_at,
        ttl_seconds: ttl.as_secs(),
        total: items.len(),
        sources: sources.to_vec(),
        failures: snapshot.failures.clone(),
        items,
    }
}
