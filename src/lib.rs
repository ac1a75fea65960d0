//! Scraping helpers for HTML pages, sitemaps and feeds, thin clients for a
//! handful of public web sources, and a SQLite full-text index of URLs.
//!
//! Everything that touches the network goes through a [`crawler::Crawler`],
//! so the same extraction code runs over plain HTTP ([`LocalCrawler`]) or a
//! headless browser service ([`ChromeCrawler`]).
pub mod config;
pub mod crawler;
pub mod defaults;
pub mod errors;
pub mod facebook;
pub mod google;
pub mod google_trends;
pub mod instagram;
pub mod news;
pub mod parsers;
pub mod rss;
pub mod site;
pub mod sitemap;
pub mod storage;
pub mod types;
pub mod util;
pub mod web;
pub mod wikidata;
pub mod youtube;

pub use config::Config;
pub use crawler::{ChromeCrawler, CrawlResponse, Crawler, LocalCrawler};
pub use errors::{Error, Result};
pub use storage::{SearchLink, UrlIndex};
pub use types::{Link, LinkMerged, LinkSource, ParsedUrl};
pub use web::WebDocument;
