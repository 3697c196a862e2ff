// tests/news_normalize.rs
use chrono::{TimeZone, Utc};
use news_aggregator::news::normalize::{item_id, normalize_feed, MAX_ITEMS_PER_SOURCE};
use news_aggregator::news::types::{Region, Source, SourceError, Topic};

const RSS_XML: &str = include_str!("fixtures/rss_basic.xml");
const ATOM_XML: &str = include_str!("fixtures/atom.xml");
const RDF_XML: &str = include_str!("fixtures/rdf.xml");
const BROKEN_XML: &str = include_str!("fixtures/malformed.xml");

fn wire() -> Source {
    Source {
        id: "wire".into(),
        name: "Sample Wire".into(),
        region: Region::Us,
        url: "https://wire.example/feed/".into(),
        tags: vec![Topic::Business],
        user_agent: None,
    }
}

#[test]
fn rss_items_are_normalized_and_untitled_dropped() {
    let items = normalize_feed(&wire(), RSS_XML).expect("rss parse ok");
    assert_eq!(items.len(), 3, "untitled entry must be dropped");

    let first = &items[0];
    assert_eq!(first.title, "Founders raise & expand seed fund");
    assert_eq!(first.url, "https://wire.example/founders-fund");
    assert_eq!(first.id, item_id("wire", "https://wire.example/founders-fund"));
    assert_eq!(first.source, "Sample Wire");
    assert_eq!(first.region, Region::Us);
    assert_eq!(first.tags, vec![Topic::Business]);
    assert_eq!(
        first.published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 6, 14, 0, 0).unwrap())
    );
    assert_eq!(first.snippet.as_deref(), Some("The fund closed its second round."));
    assert_eq!(first.image.as_deref(), Some("https://wire.example/img/fund.jpg"));
}

#[test]
fn rss_falls_back_to_dc_date_content_image_and_guid() {
    let items = normalize_feed(&wire(), RSS_XML).unwrap();

    let festival = items.iter().find(|i| i.title == "Festival lineup announced").unwrap();
    assert_eq!(
        festival.published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 7, 9, 30, 0).unwrap())
    );
    assert_eq!(festival.snippet.as_deref(), Some("Short teaser"));
    assert_eq!(
        festival.image.as_deref(),
        Some("https://wire.example/img/festival.png")
    );

    let guid_only = items.iter().find(|i| i.title == "Guid only story").unwrap();
    assert_eq!(guid_only.url, "https://wire.example/guid-only");
    assert_eq!(guid_only.published_at, None, "unparseable date stays unset");
    assert_eq!(guid_only.snippet, None);
    assert_eq!(guid_only.image, None);
}

#[test]
fn atom_entries_use_alternate_link_and_enclosure() {
    let src = Source {
        id: "atomdesk".into(),
        ..wire()
    };
    let items = normalize_feed(&src, ATOM_XML).expect("atom parse ok");
    assert_eq!(items.len(), 2, "entry without link must be dropped");

    let a = &items[0];
    assert_eq!(a.title, "Markets open higher");
    assert_eq!(a.url, "https://atom.example/markets");
    assert_eq!(a.image.as_deref(), Some("https://atom.example/markets.jpg"));
    assert_eq!(a.snippet.as_deref(), Some("Stocks rallied early."));
    assert_eq!(
        a.published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 8, 8, 0, 0).unwrap())
    );

    let b = &items[1];
    assert_eq!(b.url, "https://atom.example/second");
    assert_eq!(b.image.as_deref(), Some("https://atom.example/second.png"));
    assert_eq!(b.snippet.as_deref(), Some("Body text"));
    assert_eq!(
        b.published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 8, 9, 0, 0).unwrap())
    );
}

#[test]
fn rdf_items_are_read_from_document_root() {
    let src = Source {
        id: "allafrica".into(),
        region: Region::Africa,
        ..wire()
    };
    let items = normalize_feed(&src, RDF_XML).expect("rdf parse ok");
    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Ghana: Parliament passes budget", "Kenya: Rail line extended"]
    );
    assert!(items.iter().all(|i| i.region == Region::Africa));
    assert!(items[1].published_at.is_some());
}

#[test]
fn malformed_payload_is_a_source_level_parse_error() {
    let err = normalize_feed(&wire(), BROKEN_XML).unwrap_err();
    assert!(matches!(err, SourceError::Parse { ref source_id, .. } if source_id == "wire"));
    assert!(err.to_string().starts_with("Feed parse failed: wire"));
}

#[test]
fn non_feed_documents_are_rejected() {
    let err = normalize_feed(&wire(), "<html><body>maintenance</body></html>").unwrap_err();
    assert!(err.to_string().contains("unsupported feed format"));
    let err = normalize_feed(&wire(), "").unwrap_err();
    assert!(matches!(err, SourceError::Parse { .. }));
}

#[test]
fn output_is_capped_per_source() {
    let mut xml = String::from("<rss><channel>");
    for i in 0..(MAX_ITEMS_PER_SOURCE + 15) {
        xml.push_str(&format!(
            "<item><title>Story {i}</title><link>https://wire.example/{i}</link></item>"
        ));
    }
    xml.push_str("</channel></rss>");

    let items = normalize_feed(&wire(), &xml).unwrap();
    assert_eq!(items.len(), MAX_ITEMS_PER_SOURCE);
    assert_eq!(items[0].title, "Story 0");
}

#[test]
fn empty_channel_yields_no_items() {
    let items = normalize_feed(&wire(), "<rss><channel><title>x</title></channel></rss>").unwrap();
    assert!(items.is_empty());
}

#[test]
fn atom_html_and_xhtml_constructs_are_flattened() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Desk</title>
  <entry>
    <title type="html">T &amp;amp; U</title>
    <link href="https://atom.example/x"/>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Inline <b>body</b> text</p><img src="https://atom.example/x.png"/></div></content>
  </entry>
  <entry>
    <title type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Rich <em>title</em></div></title>
    <link href="https://atom.example/y"/>
    <summary>Plain summary</summary>
  </entry>
</feed>"#;
    let items = normalize_feed(&wire(), xml).expect("atom parse ok");
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title, "T & U");
    assert_eq!(items[0].snippet.as_deref(), Some("Inline body text"));
    assert_eq!(items[0].image.as_deref(), Some("https://atom.example/x.png"));

    assert_eq!(items[1].title, "Rich title");
    assert_eq!(items[1].snippet.as_deref(), Some("Plain summary"));
}

#[test]
fn html_named_entities_do_not_fail_the_feed() {
    let xml = r#"<rss version="2.0"><channel>
<item>
  <title>Caf&eacute; owners &copy; 2025 &bogus; news</title>
  <link>https://wire.example/cafe</link>
  <description>Na&iuml;ve &lt;b&gt;take&lt;/b&gt; &ndash; reviewed</description>
</item>
</channel></rss>"#;
    let items = normalize_feed(&wire(), xml).expect("entities must not fail the payload");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Café owners © 2025 &bogus; news");
    assert_eq!(items[0].snippet.as_deref(), Some("Naïve take - reviewed"));
}

#[test]
fn rss_image_prefers_description_over_content_encoded() {
    let xml = r#"<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"><channel>
<item>
  <title>Two images</title>
  <link>https://wire.example/two</link>
  <description><![CDATA[<img src="https://wire.example/teaser.jpg"> Teaser]]></description>
  <content:encoded><![CDATA[<img src="https://wire.example/body.jpg"><p>Body</p>]]></content:encoded>
</item>
</channel></rss>"#;
    let items = normalize_feed(&wire(), xml).unwrap();
    assert_eq!(items[0].image.as_deref(), Some("https://wire.example/teaser.jpg"));
}
