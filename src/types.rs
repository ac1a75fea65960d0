use serde::Serialize;
use std::hash::{Hash, Hasher};

// ============================================================================
// URLs and Links
// ============================================================================

/// A URL split into the parts used for classification and deduplication.
///
/// Built by [`crate::parsers::parse_url`]. Two values are the same URL when
/// their `fullurl` matches.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedUrl {
    /// The URL exactly as given (trimmed)
    pub fullurl: String,
    /// Host plus path without trailing slash, query or fragment
    pub url_short: String,
    /// Host starts with `www.`
    pub www: bool,
    /// Scheme is https
    pub secure: bool,
    /// Network location without the `www.` prefix
    pub domain_base: String,
    /// Host, plus `:port` when explicit
    pub netloc: String,
    pub path: String,
    /// Host belongs to one of the well-known social networks
    pub is_social: bool,
    pub tld: String,
}

impl PartialEq for ParsedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.fullurl == other.fullurl
    }
}

impl Eq for ParsedUrl {}

impl Hash for ParsedUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fullurl.hash(state);
    }
}

/// An anchor found in a page.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub title: Option<String>,
    /// Absolute URL, fragment removed
    pub href: String,
    /// Points to the same base domain as the page it was found on
    pub internal: bool,
    /// Points to a static asset (image, script, stylesheet, font)
    pub is_file: bool,
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.href == other.href
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.href.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub alt: Option<String>,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaTag {
    pub key: String,
    pub value: String,
}

// ============================================================================
// Merged Links
// ============================================================================

/// Where a merged link was first discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSource {
    Html,
    Sitemap,
    Rss,
}

impl LinkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkSource::Html => "html",
            LinkSource::Sitemap => "sitemap",
            LinkSource::Rss => "rss",
        }
    }
}

/// One canonical link of a site, reconciled across HTML, sitemap and RSS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkMerged {
    pub fullurl: String,
    /// Deduplication key (`ParsedUrl::url_short`)
    pub urlnorm: String,
    pub source: LinkSource,
    pub title: Option<String>,
    /// Title when known, otherwise the words of the path
    pub text: String,
    pub text_path: String,
    pub lastmod: Option<String>,
}

// ============================================================================
// Wikidata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WkEntitySearch {
    pub id: String,
    pub pageid: Option<i64>,
    pub uri: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WkEntity {
    pub id: String,
    pub pageid: Option<i64>,
    /// Entity ids of the P31 ("instance of") claims
    pub instance_of: Vec<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub modified: Option<String>,
    pub aliases: Vec<String>,
    /// Commons file name of the P18 claim
    pub image: Option<String>,
    /// The entity document as returned by the API
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WkEntityExtra {
    pub id: String,
    pub label: Option<String>,
    pub sites: Vec<String>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub ig: Option<String>,
    pub fb: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
}
