//! Shared constants: user agent, URL patterns and well-known endpoints.
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

pub const AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:92.0) Gecko/20100101 Firefox/92.0";

/// Default per-request timeout used by [`crate::crawler::Crawler::get`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Response bodies above this size are rejected (10MB).
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Static assets that are never treated as pages.
pub static EXTENSIONS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\.jpg|\.ico|\.js|\.css|\.png|\.woff2|\.svg)+").expect("valid extensions regex")
});

/// Absolute URLs embedded in free text.
pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(http|ftp|https)://([\w\-_]+(?:(?:\.[\w\-_]+)+))([\w\-.,@?^=%&:/~+#]*[\w\-@?^=%&/~+#])?",
    )
    .expect("valid url regex")
});

pub static WORDS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z]+\b").expect("valid words regex"));

pub const SOCIALS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "t.me",
    "twitter.com",
    "tiktok.com",
    "youtube.com",
    "spotify.com",
    "wikipedia.org",
    "meetup.com",
    "linkedin.com",
    "books.google.com",
    "bit.ly",
    "apps.apple.com",
    "play.google.com",
];

pub const OG_KEYS: &[&str] = &[
    "og:url",
    "og:image",
    "og:description",
    "og:type",
    "og:locale",
    "og:title",
];

/// Keys requested by [`crate::web::WebDocument::meta_og`] when none are given.
pub const DEFAULT_OG_KEYS: &[&str] = &["og:url", "og:image", "og:description", "og:type"];

pub const WIKI_API: &str = "https://www.wikidata.org/w/api.php";
