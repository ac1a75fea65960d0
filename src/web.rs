//! Downloaded pages and feed discovery.
use scraper::Html;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::crawler::{CrawlResponse, Crawler};
use crate::defaults::DEFAULT_OG_KEYS;
use crate::errors::Result;
use crate::news::ArticleData;
use crate::parsers::{self, parse_url};
use crate::rss::{find_feed_links_in_html, find_rss_related_links, RssLink};
use crate::types::{Image, Link, ParsedUrl};

/// An HTML page and the URL it was downloaded from.
///
/// Holds the raw markup; each accessor parses it on demand so the value
/// stays `Send` and cheap to clone across awaits.
#[derive(Debug, Clone)]
pub struct WebDocument {
    pub url: ParsedUrl,
    html: String,
    /// The page the crawl started from (not a page reached through it)
    pub is_root: bool,
}

impl WebDocument {
    pub fn new(url: &str, html: impl Into<String>, is_root: bool) -> Result<Self> {
        Ok(Self {
            url: parse_url(url)?,
            html: html.into(),
            is_root,
        })
    }

    /// Downloads `url` and wraps the body.
    pub async fn parse(url: &str, crawler: &dyn Crawler, is_root: bool) -> Result<Self> {
        let rsp = crawler.get(url).await?;
        tracing::debug!(url = %url, status = rsp.status_code, "Downloaded page");
        Self::new(url, rsp.text().into_owned(), is_root)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn document(&self) -> Html {
        parsers::text2soup(&self.html)
    }

    pub fn links(&self) -> Vec<Link> {
        parsers::extract_links(&self.document(), &self.url.fullurl)
    }

    pub fn images(&self) -> Vec<Image> {
        parsers::extract_images(&self.document())
    }

    pub fn ld_json(&self) -> Result<Value> {
        parsers::extract_ld_json(&self.document())
    }

    /// JSON objects embedded in inline scripts.
    pub fn json(&self) -> Vec<Value> {
        parsers::extract_json(&self.document())
    }

    /// Open Graph values keyed without `og:`; `None` asks for url, image,
    /// description and type.
    pub fn meta_og(&self, keys: Option<&[&str]>) -> HashMap<String, String> {
        parsers::extract_meta_og(&self.document(), keys.unwrap_or(DEFAULT_OG_KEYS))
    }

    pub fn title(&self) -> Option<String> {
        parsers::page_title(&self.document())
    }

    pub fn article(&self) -> ArticleData {
        ArticleData::from_html(&self.url.fullurl, &self.html)
    }

    /// Feed candidates: declared alternate links first, then feed-like anchors.
    fn feed_candidates(&self) -> Vec<String> {
        let mut candidates = find_feed_links_in_html(&self.html, &self.url.fullurl);
        for href in find_rss_related_links(&self.links()) {
            if !candidates.contains(&href) {
                candidates.push(href);
            }
        }
        candidates
    }
}

/// Downloads a page as the root of a crawl.
pub async fn download(url: &str, crawler: &dyn Crawler) -> Result<WebDocument> {
    WebDocument::parse(url, crawler, true).await
}

/// Finds the RSS/Atom feeds reachable from a page.
///
/// Candidates are the page's `<link rel="alternate">` feeds plus anchors
/// that look like feeds (see [`find_rss_related_links`]). A candidate
/// served as XML is a feed; one served as HTML is scanned one level deeper
/// the same way. Each URL is fetched at most once and failed candidates are
/// skipped.
///
/// `web` reuses an already downloaded page instead of fetching `url`.
pub async fn find_rss_links(
    url: &str,
    crawler: &dyn Crawler,
    web: Option<&WebDocument>,
) -> Result<Vec<RssLink>> {
    let downloaded;
    let web = match web {
        Some(web) => web,
        None => {
            downloaded = download(url, crawler).await?;
            &downloaded
        }
    };

    let mut visited: HashSet<String> = HashSet::from([web.url.fullurl.clone()]);
    let mut feeds = Vec::new();

    for candidate in web.feed_candidates() {
        if !visited.insert(candidate.clone()) {
            continue;
        }
        let Some(rsp) = fetch_candidate(&candidate, crawler).await else {
            continue;
        };

        if rsp.is_xml() {
            feeds.push(RssLink {
                url: candidate,
                xmlcontent: rsp.text().into_owned(),
            });
            continue;
        }
        if !rsp.is_success() {
            continue;
        }

        let Ok(page) = WebDocument::new(&candidate, rsp.text().into_owned(), false) else {
            continue;
        };
        for nested in page.feed_candidates() {
            if !visited.insert(nested.clone()) {
                continue;
            }
            if let Some(rsp) = fetch_candidate(&nested, crawler).await {
                if rsp.is_xml() {
                    feeds.push(RssLink {
                        url: nested,
                        xmlcontent: rsp.text().into_owned(),
                    });
                }
            }
        }
    }

    tracing::debug!(url = %url, feeds = feeds.len(), "Feed discovery finished");
    Ok(feeds)
}

/// Response body as HTML, unwrapping the `{"content": ...}` envelope of the
/// rendering service when the body is one.
pub(crate) fn rendered_html(rsp: &CrawlResponse) -> String {
    if rsp.is_json() {
        if let Ok(Value::Object(map)) = rsp.json() {
            if let Some(Value::String(content)) = map.get("content") {
                return content.clone();
            }
        }
    }
    rsp.text().into_owned()
}

/// Downloads a page that may come wrapped by the rendering service.
pub(crate) async fn download_rendered(url: &str, crawler: &dyn Crawler) -> Result<WebDocument> {
    let rsp = crawler.get(url).await?.error_for_status()?;
    WebDocument::new(url, rendered_html(&rsp), false)
}

async fn fetch_candidate(url: &str, crawler: &dyn Crawler) -> Option<CrawlResponse> {
    match crawler.get(url).await {
        Ok(rsp) => Some(rsp),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Feed candidate download failed");
            None
        }
    }
}
