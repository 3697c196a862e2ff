// src/news/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Region classification of a feed. Serialized exactly as shown to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "US")]
    Us,
    Africa,
    Global,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::Africa => "Africa",
            Region::Global => "Global",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    News,
    Business,
    Entertainment,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::News => "news",
            Topic::Business => "business",
            Topic::Entertainment => "entertainment",
        }
    }
}

/// One configured external feed endpoint. Immutable after registry load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub region: Region,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<Topic>,
    /// Overrides the process-wide User-Agent for this feed only.
    #[serde(default, skip_serializing)]
    pub user_agent: Option<String>,
}

/// Canonical article after normalization. `title` and `url` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Display name of the originating source.
    pub source: String,
    pub region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<Topic>,
}

/// Per-source failure. The `Display` text is what ends up in the failure map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Feed fetch failed: {source_id} ({status})")]
    Status { source_id: String, status: u16 },

    #[error("Feed fetch failed: {source_id}: {message}")]
    Transport { source_id: String, message: String },

    #[error("Feed parse failed: {source_id}: {message}")]
    Parse { source_id: String, message: String },

    #[error("Feed timed out: {source_id} (no response within {ms}ms)")]
    Timeout { source_id: String, ms: u64 },
}

impl SourceError {
    pub fn source_id(&self) -> &str {
        match self {
            SourceError::Status { source_id, .. }
            | SourceError::Transport { source_id, .. }
            | SourceError::Parse { source_id, .. }
            | SourceError::Timeout { source_id, .. } => source_id,
        }
    }

    /// Short label used as a metrics/log dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Status { .. } => "status",
            SourceError::Transport { .. } => "transport",
            SourceError::Parse { .. } => "parse",
            SourceError::Timeout { .. } => "timeout",
        }
    }
}

/// Result of one source task inside a refresh cycle.
pub type SourceOutcome = Result<Vec<NewsItem>, SourceError>;

/// Aggregated, deduplicated, newest-first result set.
///
/// Installed wholesale by [`crate::news::cache::CacheManager`]; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub items: Vec<NewsItem>,
    pub generated_at: DateTime<Utc>,
    /// sourceId -> error message, for sources that failed on the last refresh.
    pub failures: BTreeMap<String, String>,
}

/// Aggregator output before the cache decides how to install it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSnapshot {
    pub items: Vec<NewsItem>,
    pub failures: BTreeMap<String, String>,
    pub succeeded: usize,
    pub timed_out: usize,
}

impl CandidateSnapshot {
    /// True when at least one source was attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0 && !self.failures.is_empty()
    }
}
