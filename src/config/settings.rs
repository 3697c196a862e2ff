// src/config/settings.rs
use std::time::Duration;

use crate::news::cache::DEFAULT_TTL;
use crate::news::fetcher::DEFAULT_USER_AGENT;

pub const ENV_CACHE_TTL_SECS: &str = "NEWS_CACHE_TTL_SECS";
pub const ENV_REFRESH_TIMEOUT_SECS: &str = "NEWS_REFRESH_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "NEWS_USER_AGENT";

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Runtime knobs for the aggregation cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    /// Upper bound for one whole refresh pass (all sources).
    pub refresh_timeout: Duration,
    pub user_agent: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CacheSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let ttl = parse_secs(get(ENV_CACHE_TTL_SECS), 0, 24 * 3600)
            .map(Duration::from_secs)
            .unwrap_or(d.ttl);
        let refresh_timeout = parse_secs(get(ENV_REFRESH_TIMEOUT_SECS), 1, 120)
            .map(Duration::from_secs)
            .unwrap_or(d.refresh_timeout);
        let user_agent = get(ENV_USER_AGENT)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(d.user_agent);
        Self {
            ttl,
            refresh_timeout,
            user_agent,
        }
    }
}

// parse optional integer env and clamp to <min..=max>
fn parse_secs(raw: Option<String>, min: u64, max: u64) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .map(|v| v.clamp(min, max))
}
