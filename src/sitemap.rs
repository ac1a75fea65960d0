//! robots.txt and sitemaps.xml discovery.
use chrono::{NaiveDateTime, Utc};
use quick_xml::events::Event;
use serde::Serialize;

use crate::crawler::Crawler;
use crate::errors::{Error, Result};
use crate::util::days_between;
use crate::util::xml;

/// A `<loc>` entry of a url-set or sitemap index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapLink {
    pub fullurl: String,
    pub lastmod: Option<String>,
}

/// Both kinds of entries a sitemap file may hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `<urlset><url>` page entries
    pub urls: Vec<SitemapLink>,
    /// `<sitemapindex><sitemap>` child sitemaps
    pub sitemaps: Vec<SitemapLink>,
}

#[derive(Clone, Copy, PartialEq)]
enum Parent {
    Url,
    Sitemap,
}

/// Parses a sitemap in a single pass.
///
/// Namespace prefixes are ignored. Entries without a `<loc>` are dropped,
/// and `<loc>` elements nested inside extensions (`image:image`,
/// `video:video`, ...) never replace the entry's own location.
///
/// # Errors
///
/// [`Error::Xml`] on malformed XML.
pub fn parse_sitemap(content: &str) -> Result<SitemapDocument> {
    let mut reader = xml::reader(content);
    let mut buf = Vec::new();
    let mut doc = SitemapDocument::default();

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut entry: Option<(Parent, SitemapLink)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = xml::local_name(e.name().as_ref()).to_vec();
                match name.as_slice() {
                    b"url" => entry = Some((Parent::Url, empty_link())),
                    b"sitemap" => entry = Some((Parent::Sitemap, empty_link())),
                    _ => {}
                }
                stack.push(name);
            }
            Event::End(e) => {
                stack.pop();
                let closing = xml::local_name(e.name().as_ref()).to_vec();
                let done = match (&entry, closing.as_slice()) {
                    (Some((Parent::Url, _)), b"url") => true,
                    (Some((Parent::Sitemap, _)), b"sitemap") => true,
                    _ => false,
                };
                if done {
                    if let Some((parent, link)) = entry.take() {
                        if !link.fullurl.is_empty() {
                            match parent {
                                Parent::Url => doc.urls.push(link),
                                Parent::Sitemap => doc.sitemaps.push(link),
                            }
                        }
                    }
                }
            }
            Event::Text(e) => append_field(&stack, &mut entry, &xml::text(&e)?),
            Event::CData(e) => append_field(&stack, &mut entry, &xml::cdata(&e)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(doc)
}

fn empty_link() -> SitemapLink {
    SitemapLink {
        fullurl: String::new(),
        lastmod: None,
    }
}

/// Stores text found directly under `<url>`/`<sitemap>` children.
fn append_field(stack: &[Vec<u8>], entry: &mut Option<(Parent, SitemapLink)>, text: &str) {
    let Some((_, link)) = entry.as_mut() else {
        return;
    };
    let [.., parent, field] = stack else {
        return;
    };
    if !matches!(parent.as_slice(), b"url" | b"sitemap") {
        return;
    }
    let text = text.trim();
    match field.as_slice() {
        b"loc" => link.fullurl.push_str(text),
        b"lastmod" => link.lastmod.get_or_insert_with(String::new).push_str(text),
        _ => {}
    }
}

/// Page entries of a url-set sitemap (empty for a sitemap index).
pub fn sitemap_urls(content: &str) -> Result<Vec<SitemapLink>> {
    Ok(parse_sitemap(content)?.urls)
}

/// Child sitemap locations of a sitemap index.
///
/// With `filter_days`, only children whose `lastmod` parses and is at most
/// that many days old are kept. Time zones are ignored.
pub fn sitemap_sitemaps(content: &str, filter_days: Option<i64>) -> Result<Vec<String>> {
    let doc = parse_sitemap(content)?;
    Ok(filter_recent(doc.sitemaps, filter_days, Utc::now().naive_utc()))
}

fn filter_recent(
    sitemaps: Vec<SitemapLink>,
    filter_days: Option<i64>,
    now: NaiveDateTime,
) -> Vec<String> {
    sitemaps
        .into_iter()
        .filter(|s| match filter_days {
            None => true,
            Some(max) => s
                .lastmod
                .as_deref()
                .and_then(|lm| days_between(lm, now))
                .is_some_and(|days| days <= max),
        })
        .map(|s| s.fullurl)
        .collect()
}

/// Sitemap URLs declared in a robots.txt (`Sitemap:` lines, any case).
pub fn get_sitemaps_from_robots(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (key, value) = line.split_once(':')?;
            if !key.trim().eq_ignore_ascii_case("sitemap") {
                return None;
            }
            value.split_whitespace().next().map(str::to_owned)
        })
        .collect()
}

/// Collects the page entries of a site's sitemaps.
///
/// Reads `{url}/robots.txt` for `Sitemap:` declarations, falling back to
/// `{url}/sitemap.xml` when there are none. Url-sets are collected directly;
/// sitemap indexes are followed one level, keeping only children modified in
/// the last `filter_days` days. A sitemap that fails to download or parse is
/// logged and skipped.
///
/// # Errors
///
/// [`Error::RobotsTxtNotFound`] when robots.txt does not answer 2xx;
/// transport errors of the robots.txt request itself.
pub async fn build_sitemap(
    url: &str,
    crawler: &dyn Crawler,
    filter_days: i64,
) -> Result<Vec<SitemapLink>> {
    let base = url.trim_end_matches('/');
    let robots = crawler.get(&format!("{base}/robots.txt")).await?;
    if !robots.is_success() {
        return Err(Error::RobotsTxtNotFound(base.to_owned()));
    }

    let mut sitemaps = get_sitemaps_from_robots(&robots.text());
    if sitemaps.is_empty() {
        tracing::debug!(url = %base, "No Sitemap entries in robots.txt, trying /sitemap.xml");
        sitemaps.push(format!("{base}/sitemap.xml"));
    }

    let mut links = Vec::new();
    for sitemap_url in &sitemaps {
        let Some(doc) = fetch_sitemap(sitemap_url, crawler).await else {
            continue;
        };

        if !doc.urls.is_empty() {
            links.extend(doc.urls);
            continue;
        }

        let children = filter_recent(doc.sitemaps, Some(filter_days), Utc::now().naive_utc());
        tracing::debug!(sitemap = %sitemap_url, children = children.len(), "Following sitemap index");
        for child in &children {
            if let Some(child_doc) = fetch_sitemap(child, crawler).await {
                links.extend(child_doc.urls);
            }
        }
    }

    Ok(links)
}

async fn fetch_sitemap(url: &str, crawler: &dyn Crawler) -> Option<SitemapDocument> {
    let rsp = match crawler.get(url).await.and_then(|r| r.error_for_status()) {
        Ok(rsp) => rsp,
        Err(e) => {
            tracing::warn!(sitemap = %url, error = %e, "Sitemap download failed");
            return None;
        }
    };
    match parse_sitemap(&rsp.text()) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(sitemap = %url, error = %e, "Sitemap parse failed");
            None
        }
    }
}
