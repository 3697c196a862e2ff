// tests/common/mod.rs
// Shared helpers: a scripted in-memory fetcher and small feed builders.
#![allow(dead_code)]

use async_trait::async_trait;
use news_aggregator::news::types::{Region, Source, SourceError, Topic};
use news_aggregator::news::FeedFetcher;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum Script {
    Body(String),
    Status(u16),
    /// Respond with `body` after `delay`.
    Slow(Duration, String),
    /// Never respond.
    Hang,
}

/// Fetcher that answers from a per-source script and counts calls.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(pairs: Vec<(&str, Script)>) -> Self {
        let f = Self::default();
        for (id, s) in pairs {
            f.set(id, s);
        }
        f
    }

    pub fn set(&self, id: &str, script: Script) {
        self.scripts.lock().unwrap().insert(id.to_string(), script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, source: &Source) -> Result<String, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&source.id)
            .cloned()
            .unwrap_or(Script::Status(404));
        match script {
            Script::Body(b) => Ok(b),
            Script::Status(status) => Err(SourceError::Status {
                source_id: source.id.clone(),
                status,
            }),
            Script::Slow(d, b) => {
                tokio::time::sleep(d).await;
                Ok(b)
            }
            Script::Hang => std::future::pending().await,
        }
    }
}

pub fn source(id: &str, region: Region) -> Source {
    Source {
        id: id.to_string(),
        name: format!("{} News", id.to_uppercase()),
        region,
        url: format!("https://{id}.example/feed"),
        tags: vec![Topic::News],
        user_agent: None,
    }
}

/// Minimal RSS 2.0 document. Each item is `(title, url, pubDate)`; empty strings are omitted.
pub fn rss(items: &[(&str, &str, &str)]) -> String {
    let mut body = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>"#);
    for (title, url, date) in items {
        body.push_str("<item>");
        if !title.is_empty() {
            body.push_str(&format!("<title>{title}</title>"));
        }
        if !url.is_empty() {
            body.push_str(&format!("<link>{url}</link>"));
        }
        if !date.is_empty() {
            body.push_str(&format!("<pubDate>{date}</pubDate>"));
        }
        body.push_str("</item>");
    }
    body.push_str("</channel></rss>");
    body
}
