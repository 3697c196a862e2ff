// src/news/normalize.rs
//! Feed normalization: RSS 2.0, RSS 1.0 (RDF) and Atom payloads into [`NewsItem`]s.
//!
//! A payload that cannot be parsed as a whole is a source-level error; single
//! entries missing a title or url are dropped.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::events::Event;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::news::types::{NewsItem, Source, SourceError};

pub const MAX_ITEMS_PER_SOURCE: usize = 60;
pub const SNIPPET_MAX_CHARS: usize = 280;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// RSS 1.0: items are siblings of `<channel>` under the root.
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// Fields are lists so repeated or prefixed siblings (`atom:link`, `dc:date`)
/// never fail the whole payload with a duplicate-field error.
#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    link: Vec<String>,
    #[serde(default)]
    guid: Vec<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Vec<String>,
    #[serde(rename = "dc:date", alias = "date", default)]
    dc_date: Vec<String>,
    #[serde(default)]
    description: Vec<String>,
    #[serde(rename = "content:encoded", alias = "encoded", default)]
    content_encoded: Vec<String>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: Vec<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(default)]
    published: Vec<String>,
    #[serde(default)]
    updated: Vec<String>,
    #[serde(default)]
    summary: Vec<AtomText>,
    #[serde(default)]
    content: Vec<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "@type", default)]
    kind: Option<String>,
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

impl AtomText {
    fn first(v: Vec<AtomText>) -> Option<String> {
        v.into_iter().find_map(|t| non_empty(t.text))
    }

    /// First non-empty value as plain text; `html`/`xhtml` constructs are flattened.
    fn first_plain(v: Vec<AtomText>) -> Option<String> {
        v.into_iter().find_map(|t| {
            let markup = matches!(t.kind.as_deref(), Some("html") | Some("xhtml"));
            let text = non_empty(t.text)?;
            if markup {
                non_empty(Some(html_to_text(&text)))
            } else {
                Some(text)
            }
        })
    }
}

fn first(v: Vec<String>) -> Option<String> {
    v.into_iter().find_map(|s| non_empty(Some(s)))
}

/// Format-independent view of one entry, with candidate fields in priority order.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    urls: Vec<Option<String>>,
    dates: Vec<Option<String>>,
    bodies: Vec<Option<String>>,
    html: Vec<Option<String>>,
    enclosure: Option<String>,
}

impl From<RssItem> for RawEntry {
    fn from(it: RssItem) -> Self {
        let enclosure = it.enclosures.into_iter().find_map(|e| non_empty(e.url));
        let description = first(it.description);
        let content_encoded = first(it.content_encoded);
        RawEntry {
            title: first(it.title),
            urls: vec![first(it.link), first(it.guid)],
            dates: vec![first(it.pub_date), first(it.dc_date)],
            bodies: vec![description.clone(), content_encoded.clone()],
            html: vec![description, content_encoded],
            enclosure,
        }
    }
}

impl From<AtomEntry> for RawEntry {
    fn from(e: AtomEntry) -> Self {
        let mut alternate = None;
        let mut enclosure = None;
        let mut any = None;
        for l in e.links {
            let Some(href) = non_empty(l.href) else {
                continue;
            };
            match l.rel.as_deref().map(str::trim) {
                None | Some("") | Some("alternate") => {
                    alternate.get_or_insert(href);
                }
                Some("enclosure") => {
                    enclosure.get_or_insert(href);
                }
                Some(_) => {
                    any.get_or_insert(href);
                }
            }
        }
        let summary = AtomText::first(e.summary);
        let content = AtomText::first(e.content);
        RawEntry {
            title: AtomText::first_plain(e.title),
            urls: vec![alternate, any],
            dates: vec![first(e.published), first(e.updated)],
            bodies: vec![summary.clone(), content.clone()],
            html: vec![content, summary],
            enclosure,
        }
    }
}

/// Parse one source's payload into canonical items (at most [`MAX_ITEMS_PER_SOURCE`]).
pub fn normalize_feed(source: &Source, raw: &str) -> Result<Vec<NewsItem>, SourceError> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(raw.trim_start_matches('\u{feff}'));

    let parse_err = |message: String| SourceError::Parse {
        source_id: source.id.clone(),
        message,
    };

    let root = root_element(&xml).ok_or_else(|| parse_err("no root element".to_string()))?;
    let entries: Vec<RawEntry> = match root.as_str() {
        "rss" => quick_xml::de::from_str::<Rss>(&xml)
            .map_err(|e| parse_err(e.to_string()))?
            .channel
            .items
            .into_iter()
            .map(RawEntry::from)
            .collect(),
        "RDF" => quick_xml::de::from_str::<Rdf>(&xml)
            .map_err(|e| parse_err(e.to_string()))?
            .items
            .into_iter()
            .map(RawEntry::from)
            .collect(),
        "feed" => quick_xml::de::from_str::<Atom>(&escape_xhtml_constructs(&xml))
            .map_err(|e| parse_err(e.to_string()))?
            .entries
            .into_iter()
            .map(RawEntry::from)
            .collect(),
        other => return Err(parse_err(format!("unsupported feed format <{other}>"))),
    };

    let total = entries.len();
    let out: Vec<NewsItem> = entries
        .into_iter()
        .filter_map(|e| build_item(source, e))
        .take(MAX_ITEMS_PER_SOURCE)
        .collect();

    let dropped = total.saturating_sub(out.len());
    if dropped > 0 {
        counter!("news_items_dropped_total").increment(dropped as u64);
    }
    histogram!("news_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

fn build_item(source: &Source, e: RawEntry) -> Option<NewsItem> {
    let title = non_empty(e.title)?;
    let url = e.urls.into_iter().find_map(non_empty)?;

    let published_at = e
        .dates
        .iter()
        .flatten()
        .find_map(|d| parse_published(d));

    let snippet = e.bodies.iter().flatten().find_map(|b| make_snippet(b));

    let image = e
        .enclosure
        .or_else(|| e.html.iter().flatten().find_map(|h| first_img_src(h)));

    Some(NewsItem {
        id: item_id(&source.id, &url),
        title,
        url,
        source: source.name.clone(),
        region: source.region,
        published_at,
        snippet,
        image,
        tags: source.tags.clone(),
    })
}

/// `<sourceId>:<12 hex chars of sha256(url)>`, stable across refreshes.
pub fn item_id(source_id: &str, url: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(source_id.len() + 13);
    out.push_str(source_id);
    out.push(':');
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// RFC 2822, RFC 3339, or a bare `YYYY-MM-DD`.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Strip markup, decode entities, collapse whitespace, cap at [`SNIPPET_MAX_CHARS`].
pub fn make_snippet(html: &str) -> Option<String> {
    let text = html_to_text(html);
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(SNIPPET_MAX_CHARS).collect())
}

fn html_to_text(html: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));

    let stripped = re_tags.replace_all(html, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

pub fn first_img_src(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    let re = RE_IMG.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("img regex")
    });
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Local name of the first element, e.g. `rss`, `RDF`, `feed`.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Publisher feeds routinely carry HTML entities that are not valid XML.
///
/// Common punctuation is flattened to ASCII, any other HTML named entity is
/// replaced by its character (re-escaped if it is XML markup), and unknown
/// names are escaped so they survive as literal text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("entity regex"));

    let flattened = s
        .replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...");

    re.replace_all(&flattened, |c: &Captures| {
        let name = &c[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return c[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&c[0]);
        if decoded == &c[0] {
            format!("&amp;{name};")
        } else {
            html_escape::encode_safe(&decoded).into_owned()
        }
    })
    .into_owned()
}

/// Atom `type="xhtml"` constructs carry child elements instead of text.
/// Escape their inner markup so they deserialize as an HTML string.
fn escape_xhtml_constructs(xml: &str) -> String {
    static RE_XHTML: OnceCell<Regex> = OnceCell::new();
    let re = RE_XHTML.get_or_init(|| {
        Regex::new(
            r#"(?s)<((?:atom:)?(?:title|summary|content))(\s[^>]*?\btype\s*=\s*["']xhtml["'][^>]*)>(.*?)</((?:atom:)?(?:title|summary|content))>"#,
        )
        .expect("xhtml regex")
    });
    re.replace_all(xml, |c: &Captures| {
        if c[1] != c[4] {
            return c[0].to_string();
        }
        format!(
            "<{name}{attrs}>{body}</{name}>",
            name = &c[1],
            attrs = &c[2],
            body = html_escape::encode_text(&c[3]),
        )
    })
    .into_owned()
}
