//! HTTP backends used to download pages, feeds and API responses.
//!
//! Every downloader in the crate goes through the [`Crawler`] trait so the
//! same extraction code runs against a direct HTTP client
//! ([`LocalCrawler`]) or the remote rendering service ([`ChromeCrawler`],
//! [`AxiosCrawler`]).
mod chrome;
mod local;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

use crate::defaults::DEFAULT_TIMEOUT;
use crate::errors::{Error, Result};

pub use chrome::{
    process_duckduck, AxiosCrawler, Browser, ChromeConfig, ChromeCrawler, ChromeResponse,
    DuckLink, Emulation, GeoLocation, ImageResponse, Proxy, SearchDuck, SearchGoogle, ViewPort,
};
pub use local::LocalCrawler;

/// Request headers passed to [`Crawler::get_with`].
pub type Headers = HashMap<String, String>;

// ============================================================================
// Response
// ============================================================================

/// A downloaded resource.
///
/// Header names are lowercase. Non-2xx responses are returned as-is; use
/// [`CrawlResponse::error_for_status`] when a success is required.
#[derive(Debug, Clone, Default)]
pub struct CrawlResponse {
    /// Final URL after redirects
    pub url: String,
    pub content: Vec<u8>,
    pub headers: HashMap<String, String>,
    pub status_code: u16,
}

impl CrawlResponse {
    /// Body decoded as UTF-8, falling back to Latin-1 for legacy pages.
    pub fn text(&self) -> Cow<'_, str> {
        match std::str::from_utf8(&self.content) {
            Ok(s) => Cow::Borrowed(s),
            Err(_) => Cow::Owned(self.content.iter().map(|&b| b as char).collect()),
        }
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.content)?)
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.content)?)
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_json(&self) -> bool {
        self.content_type().contains("application/json")
    }

    /// True for `text/xml`, `application/xml`, `application/rss+xml`, etc.
    pub fn is_xml(&self) -> bool {
        self.content_type().contains("xml")
    }

    pub fn is_txt(&self) -> bool {
        self.content_type().contains("text/plain")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Turns a non-2xx response into [`Error::Crawling`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Crawling {
                url: self.url,
                status: self.status_code,
            })
        }
    }
}

// ============================================================================
// Crawler
// ============================================================================

/// A backend able to download a URL.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Downloads `url` with extra request headers and a timeout.
    async fn get_with(
        &self,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<CrawlResponse>;

    /// Timeout used by [`Crawler::get`].
    fn default_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Downloads `url` with no extra headers and the crawler's default timeout.
    async fn get(&self, url: &str) -> Result<CrawlResponse> {
        self.get_with(url, &Headers::new(), self.default_timeout()).await
    }
}
