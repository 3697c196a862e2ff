// src/config/sources.rs
//! Source Registry loading: explicit path, env override, shipped config, built-in seed.

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::news::types::{Region, Source, Topic};

pub const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";
pub const DEFAULT_SOURCES_TOML: &str = "config/news_sources.toml";
pub const DEFAULT_SOURCES_JSON: &str = "config/news_sources.json";

/// Load the registry from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading news sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing news sources in {}", path.display()))
}

/// Load the registry using env var + fallbacks:
/// 1) $NEWS_SOURCES_PATH
/// 2) config/news_sources.toml
/// 3) config/news_sources.json
/// 4) built-in seed
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
    }
    for candidate in [DEFAULT_SOURCES_TOML, DEFAULT_SOURCES_JSON] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_sources_from(&p);
        }
    }
    Ok(default_seed())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let sources = match hint_ext {
        "json" => parse_json(s)?,
        "toml" => parse_toml(s)?,
        // No usable extension: JSON array first, then TOML tables.
        _ => parse_json(s).or_else(|_| parse_toml(s))?,
    };
    validate(sources)
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<Source>,
    }
    Ok(toml::from_str::<TomlSources>(s)?.sources)
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    Ok(serde_json::from_str::<Vec<Source>>(s)?)
}

/// Trim fields and reject empty or duplicate ids.
fn validate(items: Vec<Source>) -> Result<Vec<Source>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut s in items {
        s.id = s.id.trim().to_string();
        s.name = s.name.trim().to_string();
        s.url = s.url.trim().to_string();
        if s.id.is_empty() || s.name.is_empty() || s.url.is_empty() {
            bail!("source entries need non-empty id, name and url");
        }
        if !seen.insert(s.id.clone()) {
            bail!("duplicate source id '{}'", s.id);
        }
        let mut tags = HashSet::new();
        s.tags.retain(|t| tags.insert(*t));
        out.push(s);
    }
    Ok(out)
}

fn seed(id: &str, name: &str, region: Region, url: &str, tags: &[Topic]) -> Source {
    Source {
        id: id.to_string(),
        name: name.to_string(),
        region,
        url: url.to_string(),
        tags: tags.to_vec(),
        user_agent: None,
    }
}

/// Built-in registry used when no config file is present.
pub fn default_seed() -> Vec<Source> {
    use Region::*;
    use Topic::*;
    vec![
        seed("thegrio", "TheGrio", Us, "https://thegrio.com/feed/", &[News, Entertainment]),
        seed("shoppeblack", "Shoppe Black", Us, "https://shoppeblack.us/feed/", &[Business]),
        seed(
            "atlantablackstar",
            "Atlanta Black Star",
            Us,
            "https://atlantablackstar.com/feed/",
            &[News, Entertainment],
        ),
        seed(
            "blackenterprise",
            "Black Enterprise",
            Us,
            "https://www.blackenterprise.com/feed/",
            &[Business],
        ),
        seed("eurweb", "EURweb", Us, "https://eurweb.com/feed/", &[Entertainment]),
        seed(
            "blackamericaweb_ent",
            "Black America Web (Entertainment)",
            Us,
            "http://www.blackamericaweb.com/rss/BAW/Entertainment.xml",
            &[Entertainment],
        ),
        seed("rollingout", "Rolling Out", Us, "https://rollingout.com/feed/", &[Entertainment]),
        seed("bossip", "Bossip", Us, "https://feeds.feedburner.com/bossiprss", &[Entertainment]),
        seed(
            "okayafrica",
            "OkayAfrica",
            Global,
            "https://www.okayafrica.com/feeds/feed.rss",
            &[News, Entertainment],
        ),
        seed(
            "face2faceafrica",
            "Face2Face Africa",
            Global,
            "https://face2faceafrica.com/feed",
            &[News, Entertainment],
        ),
        seed("africanews", "AfricaNews", Africa, "https://www.africanews.com/feed/rss", &[News]),
        seed(
            "allafrica_latest",
            "AllAfrica",
            Africa,
            "http://allafrica.com/tools/headlines/rdf/latest/headlines.rdf",
            &[News],
        ),
        seed(
            "modernghana_ent",
            "ModernGhana (Entertainment)",
            Africa,
            "https://rss.modernghana.com/entertainment.xml",
            &[Entertainment],
        ),
    ]
}
