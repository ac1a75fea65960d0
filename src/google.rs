//! Google Search result page scraping.
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::crawler::Crawler;
use crate::errors::{Error, Result};
use crate::util::collapse_whitespace;

const SEARCH_URL: &str = "https://www.google.com/search?q=";

/// Hosts that never count as results (Google itself, CDNs, schemas).
const BLACKLIST: &[&str] = &[
    "gstatic",
    "w3.org",
    "google.com",
    "googleapis.com",
    "googleadservices.com",
    "ytimg.com",
    "googleusercontent.com",
    "schema.org",
];

/// Characters left as-is when quoting the query.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

static HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[href]").expect("valid selector"));

static LOOSE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?:https?|ftp)://)?[\w/\-?=%.]+\.[\w/\-&?=%.]+").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GLink {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub links: Vec<GLink>,
    /// "Related searches" queries
    pub related: Vec<String>,
}

fn lang_params(lang: &str) -> Option<&'static str> {
    match lang.to_lowercase().as_str() {
        "es" => Some("tbs=lr:lang_1es&lr=lang_es"),
        "pt" => Some("tbs=lr:lang_1pt&lr=lang_pt"),
        _ => None,
    }
}

/// Builds the search URL for `words`, optionally restricted to a language.
///
/// # Errors
///
/// [`Error::UnsupportedLanguage`] for languages other than `es` and `pt`.
pub fn words2url(words: &str, lang: Option<&str>) -> Result<String> {
    let mut fullurl = format!("{SEARCH_URL}{}", utf8_percent_encode(words, QUERY));
    if let Some(lang) = lang {
        let params = lang_params(lang).ok_or_else(|| Error::UnsupportedLanguage(lang.to_owned()))?;
        fullurl.push('&');
        fullurl.push_str(params);
    }
    Ok(fullurl)
}

/// An absolute URL whose host is not blacklisted.
fn valid_url(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    match url.host_str() {
        Some(host) if !host.is_empty() => !BLACKLIST.iter().any(|b| host.contains(b)),
        _ => false,
    }
}

/// First `q` parameter of an href, which may be relative.
fn query_param(href: &str) -> Option<String> {
    static BASE: LazyLock<Url> =
        LazyLock::new(|| Url::parse("https://www.google.com/").expect("valid base URL"));
    let url = BASE.join(href).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Extracts the organic results and related searches of a result page.
///
/// Results come from hrefs carrying the target in their `q` parameter
/// (`/url?q=https://...`). Related searches come from `/search?q=` hrefs.
pub fn transform_result(html: &str) -> SearchResult {
    let doc = Html::parse_document(html);
    let mut result = SearchResult::default();
    let mut related = HashSet::new();

    for el in doc.select(&HREF) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(q) = query_param(href) else {
            continue;
        };

        if href.starts_with("/search") {
            if related.insert(q.clone()) {
                result.related.push(q);
            }
        } else if valid_url(&q) {
            let text = el.text().collect::<String>();
            result.links.push(GLink {
                url: q,
                text: collapse_whitespace(&text).into_owned(),
            });
        }
    }

    result
}

/// Every non-blacklisted absolute URL mentioned anywhere in the page.
pub fn transform_result_simple(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    LOOSE_URL
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|u| valid_url(u))
        .filter(|u| seen.insert(*u))
        .map(str::to_owned)
        .collect()
}

/// Runs a search through `crawler` and parses the result page.
pub async fn search(words: &str, crawler: &dyn Crawler, lang: Option<&str>) -> Result<SearchResult> {
    let url = words2url(words, lang)?;
    let rsp = crawler.get(&url).await?.error_for_status()?;
    let result = transform_result(&rsp.text());
    tracing::debug!(
        query = %words,
        links = result.links.len(),
        related = result.related.len(),
        "Google search parsed"
    );
    Ok(result)
}
