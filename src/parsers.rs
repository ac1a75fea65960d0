//! URL classification and DOM extraction helpers.
//!
//! Everything here is a pure function over a string or a parsed document;
//! network access lives in [`crate::crawler`] and [`crate::web`].
use crate::defaults::{EXTENSIONS_REGEX, SOCIALS, URL_REGEX, WORDS_REGEX};
use crate::errors::{Error, Result};
use crate::types::{Image, Link, ParsedUrl};
use crate::util::{ascii_fold, collapse_whitespace};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use url::Url;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));
static IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid img selector"));
static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid meta selector"));
static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid script selector"));
static LD_JSON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("valid ld+json selector")
});
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

/// First JSON-looking object or array on a script line.
static JSON_IN_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{.+[:,].+\}|\[.+[,:].+\]").expect("valid json-in-script regex")
});

// ============================================================================
// URLs
// ============================================================================

/// Splits a URL into the parts used to classify and deduplicate links.
///
/// # Errors
///
/// Returns [`Error::UrlParsing`] when the string has no scheme or no host.
///
/// # Examples
///
/// ```
/// use datahtml::parsers::parse_url;
///
/// let u = parse_url("https://www.google.com/test?query=testq").unwrap();
/// assert_eq!(u.url_short, "www.google.com/test");
/// assert_eq!(u.domain_base, "google.com");
/// assert!(u.secure && u.www);
/// ```
pub fn parse_url(url: &str) -> Result<ParsedUrl> {
    let fullurl = url.trim();
    let parsed = Url::parse(fullurl).map_err(|_| Error::UrlParsing(fullurl.to_owned()))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::UrlParsing(fullurl.to_owned()))?
        .to_lowercase();

    let netloc = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.clone(),
    };
    let domain_base = netloc.strip_prefix("www.").unwrap_or(&netloc).to_owned();
    let tld = host.rsplit('.').next().unwrap_or_default().to_owned();
    let path = match parsed.path() {
        "" => "/".to_owned(),
        p => p.to_owned(),
    };
    let url_short = format!("{netloc}{}", path.trim_end_matches('/'));

    Ok(ParsedUrl {
        fullurl: fullurl.to_owned(),
        url_short,
        www: host.starts_with("www."),
        secure: parsed.scheme() == "https",
        is_social: is_social_domain(&domain_base),
        domain_base,
        netloc,
        path,
        tld,
    })
}

fn is_social_domain(domain: &str) -> bool {
    SOCIALS
        .iter()
        .any(|s| domain == *s || domain.ends_with(&format!(".{s}")))
}

/// Builds readable text from the words of a URL path.
///
/// Used as a title substitute for links found without anchor text.
///
/// ```
/// use datahtml::parsers::text_from_link;
///
/// assert_eq!(
///     text_from_link("https://example.com/news/big-story-2024.html"),
///     "news big story html"
/// );
/// ```
pub fn text_from_link(url: &str) -> String {
    let path = match Url::parse(url.trim()) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(_) => url.to_owned(),
    };
    let decoded = percent_encoding::percent_decode_str(&path).decode_utf8_lossy();
    let folded = ascii_fold(&decoded);
    WORDS_REGEX
        .find_iter(&folded)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Absolute URLs found anywhere in free text.
pub fn find_urls(text: &str) -> Vec<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .collect()
}

// ============================================================================
// Documents
// ============================================================================

/// Parses an HTML string into a document.
pub fn text2soup(html: &str) -> Html {
    Html::parse_document(html)
}

/// Collapsed text content of an element, `None` when blank.
pub(crate) fn element_text(el: &ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<String>();
    let collapsed = collapse_whitespace(&text);
    (!collapsed.is_empty()).then(|| collapsed.into_owned())
}

fn skip_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.is_empty()
        || href.starts_with('#')
        || ["javascript:", "mailto:", "tel:", "data:"]
            .iter()
            .any(|p| lower.starts_with(p))
}

/// Collects every anchor of the document as an absolute [`Link`].
///
/// Relative hrefs are resolved against `fullurl`, fragments are dropped and
/// the first occurrence of each href wins.
pub fn extract_links(doc: &Html, fullurl: &str) -> Vec<Link> {
    let base = Url::parse(fullurl.trim()).ok();
    let page_domain = parse_url(fullurl).ok().map(|u| u.domain_base);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(&ANCHOR) {
        let Some(raw) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        if skip_href(raw) {
            continue;
        }

        let resolved = match &base {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        };
        let Ok(mut resolved) = resolved else {
            tracing::debug!(href = %raw, "Skipping unresolvable href");
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);

        let href = resolved.to_string();
        if !seen.insert(href.clone()) {
            continue;
        }

        let title = element_text(&el).or_else(|| {
            el.value()
                .attr("title")
                .map(|t| collapse_whitespace(t).into_owned())
                .filter(|t| !t.is_empty())
        });
        let internal = match (&page_domain, parse_url(&href)) {
            (Some(domain), Ok(u)) => &u.domain_base == domain,
            _ => false,
        };
        let is_file = EXTENSIONS_REGEX.is_match(resolved.path());

        links.push(Link {
            title,
            href,
            internal,
            is_file,
        });
    }

    links
}

pub fn extract_images(doc: &Html) -> Vec<Image> {
    doc.select(&IMG)
        .filter_map(|el| {
            let src = el.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            Some(Image {
                alt: el
                    .value()
                    .attr("alt")
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_owned),
                src: src.to_owned(),
            })
        })
        .collect()
}

/// Returns the first `application/ld+json` script that parses as JSON.
///
/// # Errors
///
/// [`Error::LdJsonNotFound`] when the page has no parsable ld+json block.
pub fn extract_ld_json(doc: &Html) -> Result<Value> {
    doc.select(&LD_JSON)
        .find_map(|el| serde_json::from_str(el.text().collect::<String>().trim()).ok())
        .ok_or(Error::LdJsonNotFound)
}

/// Open Graph values for the requested `keys`, keyed without the `og:` prefix.
///
/// Matches `<meta property=..>` and, for sites that get it wrong,
/// `<meta name=..>`. The first value of each key wins.
pub fn extract_meta_og(doc: &Html, keys: &[&str]) -> HashMap<String, String> {
    let mut found = HashMap::new();
    for el in doc.select(&META) {
        let attrs = el.value();
        let Some(prop) = attrs.attr("property").or_else(|| attrs.attr("name")) else {
            continue;
        };
        if !keys.contains(&prop) {
            continue;
        }
        if let Some(content) = attrs.attr("content") {
            let key = prop.strip_prefix("og:").unwrap_or(prop);
            found
                .entry(key.to_owned())
                .or_insert_with(|| content.trim().to_owned());
        }
    }
    found
}

/// Attribute maps of every `<meta>` element, in document order.
pub fn extract_metadata(doc: &Html) -> Vec<HashMap<String, String>> {
    doc.select(&META)
        .map(|el| {
            el.value()
                .attrs()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        })
        .collect()
}

/// Content of the first `<meta>` whose `attr` equals `value`.
pub(crate) fn meta_content(doc: &Html, attr: &str, value: &str) -> Option<String> {
    doc.select(&META)
        .filter(|el| el.value().attr(attr) == Some(value))
        .find_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
}

/// JSON values embedded in inline scripts, one per script at most.
///
/// Only single-line objects and arrays are found, which covers the
/// `var data = {...};` assignments that pages use to bootstrap state.
pub fn extract_json(doc: &Html) -> Vec<Value> {
    doc.select(&SCRIPT)
        .filter_map(|el| {
            let text = el.text().collect::<String>();
            let m = JSON_IN_SCRIPT.find(&text)?;
            serde_json::from_str(m.as_str()).ok()
        })
        .collect()
}

pub fn page_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE).next().and_then(|el| element_text(&el))
}

/// Values stored under `key` at any depth of `value`, depth first.
pub fn findkeys<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    collect_keys(value, key, &mut out);
    out
}

fn collect_keys<'a>(value: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    out.push(v);
                }
                collect_keys(v, key, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_keys(v, key, out);
            }
        }
        _ => {}
    }
}
