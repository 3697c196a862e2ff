// src/news/cache.rs
//! Process-wide aggregated snapshot with refresh-on-stale and single-flight refresh.
//!
//! Reads take a short `RwLock` read to clone an `Arc`; a refresh never holds the
//! lock while talking to the network, so readers of [`CacheManager::current`]
//! are never blocked by an in-flight refresh. Requests that find the snapshot
//! stale queue on `refresh_gate`; whoever gets it first spawns the refresh, the
//! rest observe the bumped generation and reuse that result.
//!
//! The refresh task owns the gate guard until it has installed its snapshot,
//! so a requester that goes away mid-refresh neither cancels the pass nor lets
//! a second pass start next to it.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::news::aggregator::Aggregator;
use crate::news::types::{CacheSnapshot, CandidateSnapshot, Source};

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
struct Installed {
    snapshot: Arc<CacheSnapshot>,
    refreshed_at: Option<Instant>,
    generation: u64,
}

/// State shared with the spawned refresh task.
struct Shared {
    aggregator: Aggregator,
    current: RwLock<Installed>,
}

pub struct CacheManager {
    shared: Arc<Shared>,
    ttl: Duration,
    refresh_gate: Arc<Mutex<()>>,
}

impl CacheManager {
    pub fn new(aggregator: Aggregator, ttl: Duration) -> Self {
        gauge!("news_cache_ttl_seconds").set(ttl.as_secs_f64());
        Self {
            shared: Arc::new(Shared {
                aggregator,
                current: RwLock::new(Installed {
                    snapshot: Arc::new(CacheSnapshot::default()),
                    refreshed_at: None,
                    generation: 0,
                }),
            }),
            ttl,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sources(&self) -> &[Source] {
        self.shared.aggregator.sources()
    }

    /// Currently installed snapshot, without triggering a refresh.
    pub fn current(&self) -> Arc<CacheSnapshot> {
        self.shared.current()
    }

    /// Number of refreshes installed so far.
    pub fn generation(&self) -> u64 {
        self.shared.read().generation
    }

    /// Snapshot to serve a request from: the installed one while fresh,
    /// otherwise the result of (at most one concurrent) refresh.
    pub async fn snapshot(&self) -> Arc<CacheSnapshot> {
        let seen = {
            let cur = self.shared.read();
            if !self.is_stale(&cur) {
                counter!("news_cache_hits_total").increment(1);
                debug!(target: "news", generation = cur.generation, "cache hit");
                return Arc::clone(&cur.snapshot);
            }
            cur.generation
        };

        let gate = Arc::clone(&self.refresh_gate).lock_owned().await;
        {
            let cur = self.shared.read();
            if cur.generation != seen {
                // Someone else refreshed while we were queued.
                counter!("news_cache_hits_total").increment(1);
                return Arc::clone(&cur.snapshot);
            }
        }

        counter!("news_cache_misses_total").increment(1);
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let _gate = gate;
            shared.refresh().await
        });
        match task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(target: "news", error = %e, "refresh task failed; serving installed snapshot");
                self.current()
            }
        }
    }

    fn is_stale(&self, cur: &Installed) -> bool {
        match cur.refreshed_at {
            None => true,
            Some(at) => cur.snapshot.items.is_empty() || at.elapsed() >= self.ttl,
        }
    }
}

impl Shared {
    /// Runs one aggregation pass and installs its result. Callers hold the refresh gate.
    async fn refresh(&self) -> Arc<CacheSnapshot> {
        let candidate = self.aggregator.run().await;
        let previous = self.current();

        if candidate.all_failed() {
            warn!(
                target: "news",
                failed = candidate.failures.len(),
                kept = previous.items.len(),
                "every source failed; keeping previous items"
            );
        }
        let next = Arc::new(install_candidate(&previous, candidate, Utc::now()));
        if next.items.is_empty() {
            warn!(target: "news", failed = next.failures.len(), "cache is empty after refresh");
        }

        let generation = {
            let mut cur = self.current.write().unwrap_or_else(|p| p.into_inner());
            cur.snapshot = Arc::clone(&next);
            cur.refreshed_at = Some(Instant::now());
            cur.generation += 1;
            cur.generation
        };

        gauge!("news_cache_items").set(next.items.len() as f64);
        info!(
            target: "news",
            generation,
            items = next.items.len(),
            failed = next.failures.len(),
            "snapshot installed"
        );
        next
    }

    fn current(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.read().snapshot)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Installed> {
        self.current.read().unwrap_or_else(|p| p.into_inner())
    }
}

/// Build the snapshot to install from a finished pass.
///
/// When every source failed, the previous items are carried over (if any)
/// while the failure map always reflects the latest attempt.
pub fn install_candidate(
    previous: &CacheSnapshot,
    candidate: CandidateSnapshot,
    now: DateTime<Utc>,
) -> CacheSnapshot {
    let items = if candidate.all_failed() && !previous.items.is_empty() {
        previous.items.clone()
    } else {
        candidate.items
    };
    CacheSnapshot {
        items,
        generated_at: now,
        failures: candidate.failures,
    }
}
