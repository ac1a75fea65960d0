//! RSS/Atom feed parsing and discovery.
use scraper::Selector;
use serde::Serialize;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use crate::crawler::Crawler;
use crate::errors::{Error, Result};
use crate::parsers::text2soup;
use crate::types::Link;

/// A feed item reduced to the fields used for link merging.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub link: String,
    pub title: Option<String>,
    /// RFC 3339 publication date
    pub published: Option<String>,
    pub author: Option<String>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link.hash(state);
    }
}

/// A discovered feed: its URL and the XML downloaded from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RssLink {
    pub url: String,
    pub xmlcontent: String,
}

impl RssLink {
    pub fn parse(&self) -> Result<Vec<Entry>> {
        parse(&self.xmlcontent)
    }
}

/// Parses an RSS or Atom document into [`Entry`] values.
///
/// Entries without a link are skipped. The alternate link is preferred
/// when an Atom entry carries several.
///
/// # Errors
///
/// [`Error::Feed`] when the content is not a feed.
pub fn parse(xmlcontent: &str) -> Result<Vec<Entry>> {
    let entries = parse_raw(xmlcontent)?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry
                .links
                .iter()
                .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                .or_else(|| entry.links.first())?
                .href
                .clone();
            Some(Entry {
                link,
                title: entry.title.map(|t| t.content),
                published: entry.published.map(|dt| dt.to_rfc3339()),
                author: entry.authors.into_iter().next().map(|p| p.name),
            })
        })
        .collect())
}

/// The parsed feed entries with every field `feed-rs` recognizes.
pub fn parse_raw(xmlcontent: &str) -> Result<Vec<feed_rs::model::Entry>> {
    let feed = feed_rs::parser::parse(xmlcontent.as_bytes())
        .map_err(|e| Error::Feed(e.to_string()))?;
    Ok(feed.entries)
}

/// Hrefs of links that look like feeds.
///
/// A link qualifies when it is internal and mentions `rss`, or when it
/// mentions `feed` anywhere. Order is kept and duplicates dropped.
pub fn find_rss_related_links(links: &[Link]) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .iter()
        .filter(|l| (l.internal && l.href.contains("rss")) || l.href.contains("feed"))
        .filter(|l| seen.insert(l.href.as_str()))
        .map(|l| l.href.clone())
        .collect()
}

static ALTERNATE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("link[rel][type][href]").expect("valid alternate link selector")
});

/// Feed URLs declared with `<link rel="alternate">` RSS/Atom tags.
///
/// Relative hrefs are resolved against `base_url`; duplicates are dropped.
pub fn find_feed_links_in_html(html: &str, base_url: &str) -> Vec<String> {
    let doc = text2soup(html);
    let mut found = Vec::new();

    for el in doc.select(&ALTERNATE_LINK) {
        let attr = |name| el.value().attr(name).unwrap_or_default();
        let alternate = attr("rel")
            .split_ascii_whitespace()
            .any(|rel| rel.eq_ignore_ascii_case("alternate"));
        if !alternate || !is_feed_type(attr("type")) {
            continue;
        }
        let href = attr("href").trim();
        if href.is_empty() {
            continue;
        }
        let resolved = resolve_url(href, base_url);
        if !found.contains(&resolved) {
            found.push(resolved);
        }
    }

    found
}

fn is_feed_type(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    mime.starts_with("application/rss+xml") || mime.starts_with("application/atom+xml")
}

/// Resolves a potentially relative URL against a base URL.
pub(crate) fn resolve_url(href: &str, base_url: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_owned();
    }

    if let Ok(base) = url::Url::parse(base_url) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }

    href.to_owned()
}

/// Downloads and parses a feed.
///
/// # Errors
///
/// [`Error::XmlContentNotFound`] when the response is not served as XML.
pub async fn download(url: &str, crawler: &dyn Crawler) -> Result<Vec<Entry>> {
    let rsp = crawler.get(url).await?;
    if !rsp.is_xml() {
        return Err(Error::XmlContentNotFound(url.to_owned()));
    }
    parse(&rsp.text())
}

/// Like [`download`] but keeps the full `feed-rs` entries.
pub async fn download_raw(url: &str, crawler: &dyn Crawler) -> Result<Vec<feed_rs::model::Entry>> {
    let rsp = crawler.get(url).await?;
    if !rsp.is_xml() {
        return Err(Error::XmlContentNotFound(url.to_owned()));
    }
    parse_raw(&rsp.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::LocalCrawler;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <item>
        <title>First Post</title>
        <link>https://example.com/post/1</link>
        <pubDate>Tue, 05 Mar 2024 10:20:30 GMT</pubDate>
        <author>editor@example.com (Editor)</author>
    </item>
    <item>
        <title>No link</title>
    </item>
    <item>
        <link>https://example.com/post/2</link>
        <pubDate>not a date</pubDate>
    </item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Blog</title>
  <entry>
    <id>1</id>
    <title>Atom Post</title>
    <link rel="edit" href="https://example.com/edit/1"/>
    <link rel="alternate" href="https://example.com/atom/1"/>
    <published>2024-01-01T00:00:00Z</published>
    <updated>2024-01-02T00:00:00Z</updated>
    <author><name>Jane</name></author>
  </entry>
</feed>"#;

    fn link(href: &str, internal: bool) -> Link {
        Link {
            title: None,
            href: href.to_owned(),
            internal,
            is_file: false,
        }
    }

    #[test]
    fn test_parse_rss() {
        let entries = parse(RSS).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].link, "https://example.com/post/1");
        assert_eq!(entries[0].title.as_deref(), Some("First Post"));
        assert_eq!(
            entries[0].published.as_deref(),
            Some("2024-03-05T10:20:30+00:00")
        );
        assert!(entries[0].author.is_some());
        assert_eq!(entries[1].link, "https://example.com/post/2");
        assert!(entries[1].published.is_none());
    }

    #[test]
    fn test_parse_atom_prefers_alternate() {
        let entries = RssLink {
            url: "https://example.com/atom.xml".into(),
            xmlcontent: ATOM.into(),
        }
        .parse()
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://example.com/atom/1");
        assert_eq!(entries[0].author.as_deref(), Some("Jane"));
        assert_eq!(
            entries[0].published.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_parse_not_a_feed() {
        assert!(matches!(
            parse("<html><body>Hello</body></html>"),
            Err(Error::Feed(_))
        ));
    }

    #[test]
    fn test_parse_raw_keeps_all_fields() {
        let entries = parse_raw(ATOM).unwrap();
        assert_eq!(entries[0].links.len(), 2);
        assert!(entries[0].updated.is_some());
    }

    #[test]
    fn test_find_rss_related_links() {
        let links = vec![
            link("https://example.com/rss", true),
            link("https://other.com/rss", false),
            link("https://other.com/feed/", false),
            link("https://example.com/about", true),
            link("https://example.com/rss", true),
        ];
        assert_eq!(
            find_rss_related_links(&links),
            vec![
                "https://example.com/rss".to_owned(),
                "https://other.com/feed/".to_owned()
            ]
        );
    }

    #[test]
    fn test_find_rss_link_in_html() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/feed.xml" title="RSS">
        </head><body></body></html>"#;
        assert_eq!(
            find_feed_links_in_html(html, "https://example.com"),
            vec!["https://example.com/feed.xml".to_owned()]
        );
    }

    #[test]
    fn test_find_feed_links_reversed_attrs_and_multiple() {
        let html = r#"<html><head>
            <link href="/feed.xml" type="application/rss+xml" rel="alternate">
            <link rel='alternate' type='application/atom+xml' href='https://example.com/Atom.xml'>
            <link rel="stylesheet" href="/style.css">
            <link rel="alternate" hreflang="es" href="/es/">
        </head></html>"#;
        assert_eq!(
            find_feed_links_in_html(html, "https://example.com/blog/"),
            vec![
                "https://example.com/feed.xml".to_owned(),
                "https://example.com/Atom.xml".to_owned()
            ]
        );
    }

    #[test]
    fn test_find_feed_links_unquoted_and_mixed_case() {
        let html = "<html><head>\
            <link rel=alternate type=application/rss+xml href=/index.xml>\
            <LINK REL=\"Alternate\" TYPE=\"Application/Atom+XML\" HREF=\"atom.xml\">\
            <link rel=\"alternate nofollow\" type=\"application/rss+xml; charset=utf-8\" href=\"/index.xml\">\
            <link rel=alternate type=text/html href=/amp/>\
            </head></html>";
        assert_eq!(
            find_feed_links_in_html(html, "https://blog.example.com/posts/"),
            vec![
                "https://blog.example.com/index.xml".to_owned(),
                "https://blog.example.com/posts/atom.xml".to_owned()
            ]
        );
    }

    #[test]
    fn test_find_feed_links_none() {
        assert!(find_feed_links_in_html("<html><head></head></html>", "https://e.com").is_empty());
    }

    #[tokio::test]
    async fn test_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(RSS, "application/rss+xml"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let crawler = LocalCrawler::new().unwrap();
        let entries = download(&format!("{}/feed", server.uri()), &crawler).await.unwrap();
        assert_eq!(entries.len(), 2);

        let raw = download_raw(&format!("{}/feed", server.uri()), &crawler).await.unwrap();
        assert_eq!(raw.len(), 3);

        let err = download(&format!("{}/page", server.uri()), &crawler)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::XmlContentNotFound(_)));
    }
}
