//! Google Trends "trending searches" feed.
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use serde::Serialize;

use crate::crawler::Crawler;
use crate::errors::Result;
use crate::util::{parse_datetime, xml};

pub const TRENDS_URL: &str = "https://trends.google.com/trending/rss?geo=";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoogleTrend {
    pub title: String,
    /// Approximate search volume as published, e.g. `200+`
    pub aprox_traffic: String,
    pub description: String,
    pub news: Vec<NewsItem>,
    pub pubdate: Option<DateTime<Utc>>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleTrendList {
    pub geo: String,
    pub trends: Vec<GoogleTrend>,
}

/// Parses the `<item>` elements of a trends feed.
///
/// # Errors
///
/// [`crate::Error::Xml`] on malformed XML.
pub fn parse_entries(content: &str) -> Result<Vec<GoogleTrend>> {
    let mut reader = xml::reader(content);
    let mut buf = Vec::new();
    let mut trends = Vec::new();

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut trend: Option<GoogleTrend> = None;
    let mut news: Option<NewsItem> = None;
    let mut pubdate = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"item" => {
                        trend = Some(GoogleTrend::default());
                        pubdate.clear();
                    }
                    b"ht:news_item" if trend.is_some() => news = Some(NewsItem::default()),
                    _ => {}
                }
                stack.push(name);
            }
            Event::End(e) => {
                stack.pop();
                match e.name().as_ref() {
                    b"ht:news_item" => {
                        if let (Some(t), Some(item)) = (trend.as_mut(), news.take()) {
                            t.news.push(item);
                        }
                    }
                    b"item" => {
                        if let Some(mut t) = trend.take() {
                            t.pubdate = parse_datetime(pubdate.trim());
                            trends.push(t);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                let text = xml::text(&e)?;
                store(&stack, trend.as_mut(), news.as_mut(), &mut pubdate, &text);
            }
            Event::CData(e) => {
                let text = xml::cdata(&e);
                store(&stack, trend.as_mut(), news.as_mut(), &mut pubdate, &text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(trends)
}

fn store(
    stack: &[Vec<u8>],
    trend: Option<&mut GoogleTrend>,
    news: Option<&mut NewsItem>,
    pubdate: &mut String,
    text: &str,
) {
    let Some(trend) = trend else {
        return;
    };
    let Some(field) = stack.last() else {
        return;
    };

    if let Some(item) = news {
        let target = match field.as_slice() {
            b"ht:news_item_title" => &mut item.title,
            b"ht:news_item_snippet" => &mut item.snippet,
            b"ht:news_item_url" => &mut item.url,
            b"ht:news_item_source" => &mut item.source,
            _ => return,
        };
        target.push_str(text);
        return;
    }

    match field.as_slice() {
        b"title" => trend.title.push_str(text),
        b"description" => trend.description.push_str(text),
        b"ht:approx_traffic" => trend.aprox_traffic.push_str(text),
        b"pubDate" => pubdate.push_str(text),
        b"ht:picture" => trend.picture.get_or_insert_with(String::new).push_str(text),
        _ => {}
    }
}

/// Downloads the trending searches of a country.
///
/// `geo` is an ISO country code (upper-cased before use); `base_url`
/// defaults to [`TRENDS_URL`].
pub async fn download(
    geo: &str,
    crawler: &dyn Crawler,
    base_url: Option<&str>,
) -> Result<GoogleTrendList> {
    let geo = geo.to_uppercase();
    let url = format!("{}{geo}", base_url.unwrap_or(TRENDS_URL));
    let rsp = crawler.get(&url).await?.error_for_status()?;
    let trends = parse_entries(&rsp.text())?;
    tracing::debug!(geo = %geo, trends = trends.len(), "Google Trends downloaded");
    Ok(GoogleTrendList { geo, trends })
}
