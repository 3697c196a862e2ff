// src/news/aggregator.rs
use metrics::{counter, histogram};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::news::fetcher::FeedFetcher;
use crate::news::normalize::normalize_feed;
use crate::news::types::{CandidateSnapshot, Source, SourceError, SourceOutcome};

/// Fans one task out per source and joins them all, bounded by `timeout`.
pub struct Aggregator {
    sources: Vec<Source>,
    fetcher: Arc<dyn FeedFetcher>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(sources: Vec<Source>, fetcher: Arc<dyn FeedFetcher>, timeout: Duration) -> Self {
        Self {
            sources,
            fetcher,
            timeout,
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// One refresh pass. Never fails as a whole: every source either
    /// contributes items or an entry in the failure map.
    pub async fn run(&self) -> CandidateSnapshot {
        crate::news::ensure_metrics_described();
        let t0 = std::time::Instant::now();
        let deadline = tokio::time::Instant::now() + self.timeout;

        let handles: Vec<JoinHandle<SourceOutcome>> = self
            .sources
            .iter()
            .map(|s| {
                let fetcher = Arc::clone(&self.fetcher);
                let source = s.clone();
                tokio::spawn(async move { fetch_and_normalize(fetcher.as_ref(), &source).await })
            })
            .collect();

        // Full join in registry order; the shared deadline bounds the whole pass.
        let mut outcomes = Vec::with_capacity(handles.len());
        for (source, mut handle) in self.sources.iter().zip(handles) {
            let outcome = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_err)) => Err(SourceError::Transport {
                    source_id: source.id.clone(),
                    message: format!("task failed: {join_err}"),
                }),
                Err(_) => {
                    handle.abort();
                    Err(SourceError::Timeout {
                        source_id: source.id.clone(),
                        ms: self.timeout.as_millis() as u64,
                    })
                }
            };
            if let Err(e) = &outcome {
                warn!(target: "news", source = %source.id, kind = e.kind(), error = %e, "source failed");
                counter!("news_source_failures_total", "kind" => e.kind()).increment(1);
            }
            outcomes.push(outcome);
        }

        let candidate = merge_outcomes(&self.sources, outcomes);

        let elapsed_ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("news_refresh_ms").record(elapsed_ms);
        counter!("news_refresh_total").increment(1);
        info!(
            target: "news",
            items = candidate.items.len(),
            succeeded = candidate.succeeded,
            failed = candidate.failures.len(),
            timed_out = candidate.timed_out,
            elapsed_ms = elapsed_ms as u64,
            "refresh pass finished"
        );
        candidate
    }
}

async fn fetch_and_normalize(fetcher: &dyn FeedFetcher, source: &Source) -> SourceOutcome {
    let raw = fetcher.fetch(source).await?;
    normalize_feed(source, &raw)
}

/// Join step over settled source results (paired with `sources` by position):
/// concatenate in registry order, drop repeated urls keeping the first,
/// then sort newest first with undated items last.
pub fn merge_outcomes(sources: &[Source], outcomes: Vec<SourceOutcome>) -> CandidateSnapshot {
    let mut merged = Vec::new();
    let mut failures = BTreeMap::new();
    let mut succeeded = 0usize;
    let mut timed_out = 0usize;

    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(mut items) => {
                succeeded += 1;
                merged.append(&mut items);
            }
            Err(e) => {
                if matches!(e, SourceError::Timeout { .. }) {
                    timed_out += 1;
                }
                failures.insert(source.id.clone(), e.to_string());
            }
        }
    }

    // Exact url match; tracking parameters are not normalized away.
    let mut seen: HashSet<String> = HashSet::with_capacity(merged.len());
    merged.retain(|it| seen.insert(it.url.clone()));

    // Stable: equal timestamps keep registry order. `None` orders below any date.
    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    CandidateSnapshot {
        items: merged,
        failures,
        succeeded,
        timed_out,
    }
}
