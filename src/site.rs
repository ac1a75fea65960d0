//! Merges the links of a site discovered from its HTML, sitemap and feeds.
//!
//! Every source is reduced to [`LinkMerged`] records keyed by the URL's
//! `url_short` (host and path, no query or trailing slash), so the same page
//! reached through different sources collapses into one record.
use std::collections::HashMap;

use crate::config::Config;
use crate::crawler::Crawler;
use crate::errors::Result;
use crate::parsers::{parse_url, text_from_link};
use crate::rss::Entry;
use crate::sitemap::{build_sitemap, SitemapLink};
use crate::types::{LinkMerged, LinkSource};
use crate::web::{download, find_rss_links, WebDocument};

/// Which sources [`extract_links`] consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSources {
    pub html: bool,
    pub rss: bool,
    pub sitemap: bool,
    /// Child sitemaps older than this are not followed
    pub sitemap_filter_days: i64,
}

impl Default for LinkSources {
    fn default() -> Self {
        Self {
            html: true,
            rss: true,
            sitemap: false,
            sitemap_filter_days: 1,
        }
    }
}

impl LinkSources {
    /// Default sources with the configured sitemap age filter.
    pub fn from_config(config: &Config) -> Self {
        Self {
            sitemap_filter_days: config.sitemap_filter_days,
            ..Self::default()
        }
    }
}

/// Insertion-ordered map of merged links.
#[derive(Default)]
struct MergedLinks {
    links: Vec<LinkMerged>,
    index: HashMap<String, usize>,
}

impl MergedLinks {
    fn get_mut(&mut self, key: &str) -> Option<&mut LinkMerged> {
        let pos = *self.index.get(key)?;
        self.links.get_mut(pos)
    }

    fn insert(&mut self, key: String, link: LinkMerged) {
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key, self.links.len());
        self.links.push(link);
    }
}

/// Merges the three link sources into one deduplicated list.
///
/// 1. HTML: internal anchors that are not files and not the site root.
///    `text` is the anchor title, else the words of the URL path.
/// 2. Sitemap: new pages are added; known pages get the sitemap `lastmod`.
/// 3. RSS: only pages not seen yet, titled and dated from the entry.
///
/// The first source that mentions a page fixes its position in the output.
/// URLs that fail to parse are skipped.
pub fn links_mapping(
    sitemap: &[SitemapLink],
    web: Option<&WebDocument>,
    rss: &[Entry],
) -> Vec<LinkMerged> {
    let mut merged = MergedLinks::default();

    if let Some(web) = web {
        for link in web.links() {
            if !link.internal || link.is_file {
                continue;
            }
            let Ok(url) = parse_url(&link.href) else {
                tracing::warn!(url = %link.href, "Skipping unparsable page link");
                continue;
            };
            if url.path == "/" {
                continue;
            }
            let text_path = text_from_link(&link.href);
            merged.insert(
                url.url_short.clone(),
                LinkMerged {
                    text: link.title.clone().unwrap_or_else(|| text_path.clone()),
                    fullurl: link.href,
                    urlnorm: url.url_short,
                    source: LinkSource::Html,
                    title: link.title,
                    text_path,
                    lastmod: None,
                },
            );
        }
    }

    for entry in sitemap {
        let Ok(url) = parse_url(&entry.fullurl) else {
            tracing::warn!(url = %entry.fullurl, "Skipping unparsable sitemap link");
            continue;
        };
        if let Some(existing) = merged.get_mut(&url.url_short) {
            existing.lastmod = entry.lastmod.clone();
            continue;
        }
        let text_path = text_from_link(&entry.fullurl);
        merged.insert(
            url.url_short.clone(),
            LinkMerged {
                fullurl: entry.fullurl.clone(),
                urlnorm: url.url_short,
                source: LinkSource::Sitemap,
                title: None,
                text: text_path.clone(),
                text_path,
                lastmod: entry.lastmod.clone(),
            },
        );
    }

    for entry in rss {
        let Ok(url) = parse_url(&entry.link) else {
            tracing::warn!(url = %entry.link, "Skipping unparsable feed link");
            continue;
        };
        let text_path = text_from_link(&entry.link);
        merged.insert(
            url.url_short.clone(),
            LinkMerged {
                fullurl: entry.link.clone(),
                urlnorm: url.url_short,
                source: LinkSource::Rss,
                title: entry.title.clone(),
                text: entry.title.clone().unwrap_or_else(|| text_path.clone()),
                text_path,
                lastmod: entry.published.clone(),
            },
        );
    }

    merged.links
}

/// Collects and merges the links of the site at `fullurl`.
///
/// The page itself is downloaded when `html` or `rss` is requested, and a
/// failure there is returned. A site without robots.txt or usable sitemaps
/// contributes no sitemap links; feeds that fail to parse are skipped.
pub async fn extract_links(
    fullurl: &str,
    crawler: &dyn Crawler,
    sources: LinkSources,
) -> Result<Vec<LinkMerged>> {
    let web = if sources.html || sources.rss {
        Some(download(fullurl, crawler).await?)
    } else {
        None
    };

    let sitemap = if sources.sitemap {
        match build_sitemap(fullurl, crawler, sources.sitemap_filter_days).await {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(url = %fullurl, error = %e, "Sitemap unavailable");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let mut entries = Vec::new();
    if let (true, Some(page)) = (sources.rss, web.as_ref()) {
        for feed in find_rss_links(fullurl, crawler, Some(page)).await? {
            match feed.parse() {
                Ok(parsed) => entries.extend(parsed),
                Err(e) => tracing::warn!(feed = %feed.url, error = %e, "Skipping unparsable feed"),
            }
        }
    }

    let html = if sources.html { web.as_ref() } else { None };
    let links = links_mapping(&sitemap, html, &entries);
    tracing::info!(
        url = %fullurl,
        sitemap = sitemap.len(),
        rss = entries.len(),
        merged = links.len(),
        "Links extracted"
    );
    Ok(links)
}
