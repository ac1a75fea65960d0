//! YouTube channel, video and search pages, and channel feeds.
//!
//! Pages are parsed from their meta tags and from the JSON state YouTube
//! embeds in inline scripts (`ytInitialData`). The [`api`] module talks to
//! the Data API instead.
pub mod api;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

use crate::crawler::Crawler;
use crate::errors::{Error, Result};
use crate::parsers::{extract_json, extract_metadata, findkeys, text2soup};
use crate::util::{parse_datetime, xml};

const BASE_URL: &str = "https://www.youtube.com";

static YT_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse(BASE_URL).expect("valid base URL"));

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelMeta {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    /// As displayed, e.g. `1.2M subscribers`
    pub subscribers: Option<String>,
    pub family_safe: bool,
    pub available_countries: Vec<String>,
    pub view_count: Option<String>,
    pub joined: Option<String>,
    pub location: Option<String>,
    /// Targets of the links shown in the channel banner
    pub social_links: Vec<String>,
    pub crawled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Video {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub channel_id: Option<String>,
    /// ISO 8601 duration, e.g. `PT4M13S`
    pub duration: Option<String>,
    pub upload_date: Option<String>,
    pub genre: Option<String>,
    pub family_friendly: bool,
    pub interaction_count: Option<u64>,
    pub tags: Vec<String>,
    pub crawled_at: DateTime<Utc>,
}

/// A result of the search page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchVideo {
    pub id: String,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub channel_id: Option<String>,
    pub published_text: Option<String>,
    pub view_count_text: Option<String>,
    pub length_text: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// An entry of a channel's Atom feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RssVideo {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub link: Option<String>,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub views: Option<u64>,
}

// ============================================================================
// URLs
// ============================================================================

pub fn from_id2url(id: &str) -> String {
    format!("{BASE_URL}/channel/{id}")
}

pub fn video_url(id: &str) -> String {
    format!("{BASE_URL}/watch?v={id}")
}

pub fn channel_rss_url(id: &str) -> String {
    format!("{BASE_URL}/feeds/videos.xml?channel_id={id}")
}

// ============================================================================
// Pages
// ============================================================================

/// Content of the first meta tag whose `itemprop`, `name` or `property`
/// equals `key`.
fn meta_value(metas: &[HashMap<String, String>], key: &str) -> Option<String> {
    metas
        .iter()
        .find(|m| {
            ["itemprop", "name", "property"]
                .iter()
                .any(|attr| m.get(*attr).map(String::as_str) == Some(key))
        })
        .and_then(|m| m.get("content").cloned())
}

fn first_key<'a>(data: &'a [Value], key: &str) -> Option<&'a Value> {
    data.iter().find_map(|d| findkeys(d, key).into_iter().next())
}

fn simple_text(value: &Value) -> Option<String> {
    value
        .get("simpleText")
        .or_else(|| value.pointer("/runs/0/text"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Target of a banner link (`/redirect?...&q=<target>`), or the link itself.
fn social_link(link: &Value) -> Option<String> {
    let href = link
        .pointer("/navigationEndpoint/urlEndpoint/url")
        .and_then(Value::as_str)?;
    let url = YT_BASE.join(href).ok()?;
    let target = url
        .query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.into_owned());
    Some(target.unwrap_or_else(|| url.to_string()))
}

/// Parses a channel page.
///
/// # Errors
///
/// [`Error::MissingField`] when the page has no channel id.
pub fn transform_channel(html: &str) -> Result<ChannelMeta> {
    let (metas, data) = {
        let doc = text2soup(html);
        (extract_metadata(&doc), extract_json(&doc))
    };

    let id = meta_value(&metas, "channelId")
        .or_else(|| meta_value(&metas, "identifier"))
        .ok_or(Error::MissingField("channelId"))?;
    let microformat = first_key(&data, "microformatDataRenderer");

    let social_links = first_key(&data, "primaryLinks")
        .and_then(Value::as_array)
        .map(|links| links.iter().filter_map(social_link).collect())
        .unwrap_or_default();

    Ok(ChannelMeta {
        id,
        name: meta_value(&metas, "name").or_else(|| meta_value(&metas, "og:title")),
        description: meta_value(&metas, "og:description"),
        thumbnail_url: meta_value(&metas, "og:image"),
        tags: string_list(microformat.and_then(|m| m.get("tags"))),
        subscribers: first_key(&data, "subscriberCountText")
            .and_then(simple_text)
            .map(|s| s.replace('\u{a0}', " ")),
        family_safe: microformat
            .and_then(|m| m.get("familySafe"))
            .and_then(Value::as_bool)
            .unwrap_or(false),
        available_countries: string_list(microformat.and_then(|m| m.get("availableCountries"))),
        view_count: first_key(&data, "viewCountText").and_then(simple_text),
        joined: first_key(&data, "joinedDateText")
            .and_then(|j| j.pointer("/runs/1/text"))
            .and_then(Value::as_str)
            .map(str::to_owned),
        location: first_key(&data, "country").and_then(simple_text),
        social_links,
        crawled_at: Utc::now(),
    })
}

/// Parses a watch page from its meta tags.
///
/// # Errors
///
/// [`Error::MissingField`] when the page has no video id.
pub fn transform_video(html: &str) -> Result<Video> {
    let metas = extract_metadata(&text2soup(html));
    let id = meta_value(&metas, "videoId").ok_or(Error::MissingField("videoId"))?;

    let tags = metas
        .iter()
        .filter(|m| m.get("property").map(String::as_str) == Some("og:video:tag"))
        .filter_map(|m| m.get("content").cloned())
        .collect();

    Ok(Video {
        id,
        title: meta_value(&metas, "name").or_else(|| meta_value(&metas, "og:title")),
        description: meta_value(&metas, "description")
            .or_else(|| meta_value(&metas, "og:description")),
        thumbnail_url: meta_value(&metas, "og:image"),
        channel_id: meta_value(&metas, "channelId"),
        duration: meta_value(&metas, "duration"),
        upload_date: meta_value(&metas, "uploadDate"),
        genre: meta_value(&metas, "genre"),
        family_friendly: meta_value(&metas, "isFamilyFriendly")
            .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        interaction_count: meta_value(&metas, "interactionCount").and_then(|c| c.parse().ok()),
        tags,
        crawled_at: Utc::now(),
    })
}

/// Videos listed on a search result page.
pub fn transform_search(html: &str) -> Vec<SearchVideo> {
    let data = extract_json(&text2soup(html));
    data.iter()
        .flat_map(|d| findkeys(d, "videoRenderer"))
        .filter_map(|r| {
            let text = |key: &str| r.get(key).and_then(simple_text);
            Some(SearchVideo {
                id: r.get("videoId")?.as_str()?.to_owned(),
                title: text("title"),
                channel: text("ownerText"),
                channel_id: r
                    .pointer("/ownerText/runs/0/navigationEndpoint/browseEndpoint/browseId")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                published_text: text("publishedTimeText"),
                view_count_text: text("viewCountText"),
                length_text: text("lengthText"),
                thumbnail_url: r
                    .pointer("/thumbnail/thumbnails")
                    .and_then(Value::as_array)
                    .and_then(|t| t.last())
                    .and_then(|t| t.get("url"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            })
        })
        .collect()
}

// ============================================================================
// Channel feed
// ============================================================================

/// Parses a channel's `feeds/videos.xml` document.
///
/// # Errors
///
/// [`Error::Xml`] on malformed XML.
pub fn transform_rss(content: &str) -> Result<Vec<RssVideo>> {
    let mut reader = xml::reader(content);
    let mut buf = Vec::new();
    let mut videos = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<RssVideo> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if e.name().as_ref() == b"entry" {
                    current = Some(RssVideo::default());
                }
                if let Some(video) = current.as_mut() {
                    read_attributes(&e, &reader, video)?;
                }
                stack.push(e.name().as_ref().to_vec());
            }
            Event::Empty(e) => {
                if let Some(video) = current.as_mut() {
                    read_attributes(&e, &reader, video)?;
                }
            }
            Event::End(e) => {
                stack.pop();
                if e.name().as_ref() == b"entry" {
                    if let Some(video) = current.take().filter(|v| !v.id.is_empty()) {
                        videos.push(video);
                    }
                }
            }
            Event::Text(e) => {
                if let Some(video) = current.as_mut() {
                    read_text(&stack, video, &xml::text(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(videos)
}

fn read_attributes(e: &BytesStart<'_>, reader: &Reader<&[u8]>, video: &mut RssVideo) -> Result<()> {
    match e.name().as_ref() {
        b"link" => {
            let rel = xml::attr(e, reader, b"rel")?;
            if matches!(rel.as_deref(), None | Some("alternate")) {
                video.link = xml::attr(e, reader, b"href")?;
            }
        }
        b"media:thumbnail" => video.thumbnail_url = xml::attr(e, reader, b"url")?,
        b"media:statistics" => {
            video.views = xml::attr(e, reader, b"views")?.and_then(|v| v.parse().ok());
        }
        _ => {}
    }
    Ok(())
}

fn read_text(stack: &[Vec<u8>], video: &mut RssVideo, text: &str) {
    let [.., parent, field] = stack else {
        return;
    };
    match (parent.as_slice(), field.as_slice()) {
        (b"entry", b"yt:videoId") => video.id = text.to_owned(),
        (b"entry", b"yt:channelId") => video.channel_id = text.to_owned(),
        (b"entry", b"title") => video.title = text.to_owned(),
        (b"entry", b"published") => video.published = parse_datetime(text),
        (b"entry", b"updated") => video.updated = parse_datetime(text),
        (b"author", b"name") => video.author = Some(text.to_owned()),
        (b"media:group", b"media:description") => video.description = Some(text.to_owned()),
        _ => {}
    }
}

// ============================================================================
// Downloads
// ============================================================================

pub async fn channel(id: &str, crawler: &dyn Crawler) -> Result<ChannelMeta> {
    let rsp = crawler.get(&from_id2url(id)).await?.error_for_status()?;
    transform_channel(&rsp.text())
}

pub async fn video(id: &str, crawler: &dyn Crawler) -> Result<Video> {
    let rsp = crawler.get(&video_url(id)).await?.error_for_status()?;
    transform_video(&rsp.text())
}

/// Latest uploads of a channel from its public feed.
pub async fn channel_videos(id: &str, crawler: &dyn Crawler) -> Result<Vec<RssVideo>> {
    let rsp = crawler.get(&channel_rss_url(id)).await?.error_for_status()?;
    transform_rss(&rsp.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHANNEL: &str = r#"<html><head>
<meta property="og:title" content="Rust Videos">
<meta property="og:description" content="Talks about Rust">
<meta property="og:image" content="https://yt3.ggpht.com/avatar.jpg">
<meta itemprop="name" content="Rust Videos">
<meta itemprop="channelId" content="UCaYhcUwRBNscFNUKTjgPFiA">
</head><body>
<script>var ytcfg = {"INNERTUBE_API_KEY": "abc", "LOGGED_IN": false};</script>
<script>var ytInitialData = {"header": {"c4TabbedHeaderRenderer": {"subscriberCountText": {"simpleText": "12,3 k subscribers"}}}, "microformat": {"microformatDataRenderer": {"tags": ["rust", "programming"], "familySafe": true, "availableCountries": ["AR", "US"]}}, "about": {"country": {"simpleText": "Argentina"}, "viewCountText": {"simpleText": "1,234 views"}, "joinedDateText": {"runs": [{"text": "Joined "}, {"text": "Mar 5, 2016"}]}, "primaryLinks": [{"navigationEndpoint": {"urlEndpoint": {"url": "https://www.youtube.com/redirect?event=channel_banner&q=https%3A%2F%2Ftwitter.com%2Frustlang"}}}, {"navigationEndpoint": {"urlEndpoint": {"url": "https://www.rust-lang.org/"}}}, {"title": "no endpoint"}]}};</script>
</body></html>"#;

    const VIDEO: &str = r#"<html><head>
<meta name="title" content="Ownership explained">
<meta name="description" content="A talk">
<meta property="og:image" content="https://i.ytimg.com/vi/abc123/hq.jpg">
<meta property="og:video:tag" content="rust">
<meta property="og:video:tag" content="ownership">
<meta itemprop="name" content="Ownership explained">
<meta itemprop="videoId" content="abc123">
<meta itemprop="channelId" content="UCaYhcUwRBNscFNUKTjgPFiA">
<meta itemprop="duration" content="PT4M13S">
<meta itemprop="uploadDate" content="2024-03-05">
<meta itemprop="genre" content="Education">
<meta itemprop="isFamilyFriendly" content="True">
<meta itemprop="interactionCount" content="98765">
</head><body></body></html>"#;

    const SEARCH: &str = r#"<html><body>
<script>var ytInitialData = {"contents": {"sectionListRenderer": {"contents": [{"videoRenderer": {"videoId": "v1", "title": {"runs": [{"text": "First"}]}, "ownerText": {"runs": [{"text": "Chan", "navigationEndpoint": {"browseEndpoint": {"browseId": "UC1"}}}]}, "publishedTimeText": {"simpleText": "2 days ago"}, "viewCountText": {"simpleText": "10 views"}, "lengthText": {"simpleText": "3:01"}, "thumbnail": {"thumbnails": [{"url": "small.jpg"}, {"url": "big.jpg"}]}}}, {"videoRenderer": {"title": {"runs": [{"text": "no id"}]}}}, {"videoRenderer": {"videoId": "v2"}}]}}};</script>
</body></html>"#;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UC1"/>
 <yt:channelId>UC1</yt:channelId>
 <title>Chan</title>
 <author><name>Chan</name></author>
 <entry>
  <id>yt:video:v1</id>
  <yt:videoId>v1</yt:videoId>
  <yt:channelId>UC1</yt:channelId>
  <title>First &amp; best</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=v1"/>
  <author><name>Chan</name><uri>https://www.youtube.com/channel/UC1</uri></author>
  <published>2024-03-01T10:00:00+00:00</published>
  <updated>2024-03-02T11:00:00+00:00</updated>
  <media:group>
   <media:title>First &amp; best</media:title>
   <media:thumbnail url="https://i1.ytimg.com/vi/v1/hqdefault.jpg" width="480" height="360"/>
   <media:description>About the first video</media:description>
   <media:community>
    <media:starRating count="10" average="5.00" min="1" max="5"/>
    <media:statistics views="1234"/>
   </media:community>
  </media:group>
 </entry>
 <entry>
  <yt:videoId>v2</yt:videoId>
  <title>Second</title>
 </entry>
</feed>"#;

    #[test]
    fn test_urls() {
        assert_eq!(from_id2url("UC1"), "https://www.youtube.com/channel/UC1");
        assert_eq!(
            channel_rss_url("UC1"),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UC1"
        );
        assert_eq!(video_url("v1"), "https://www.youtube.com/watch?v=v1");
    }

    #[test]
    fn test_transform_channel() {
        let channel = transform_channel(CHANNEL).unwrap();
        assert_eq!(channel.id, "UCaYhcUwRBNscFNUKTjgPFiA");
        assert_eq!(channel.name.as_deref(), Some("Rust Videos"));
        assert_eq!(channel.description.as_deref(), Some("Talks about Rust"));
        assert_eq!(channel.tags, vec!["rust", "programming"]);
        assert_eq!(channel.available_countries, vec!["AR", "US"]);
        assert!(channel.family_safe);
        assert_eq!(channel.subscribers.as_deref(), Some("12,3 k subscribers"));
        assert_eq!(channel.location.as_deref(), Some("Argentina"));
        assert_eq!(channel.view_count.as_deref(), Some("1,234 views"));
        assert_eq!(channel.joined.as_deref(), Some("Mar 5, 2016"));
        assert_eq!(
            channel.social_links,
            vec!["https://twitter.com/rustlang", "https://www.rust-lang.org/"]
        );
    }

    #[test]
    fn test_transform_channel_without_id() {
        let err = transform_channel("<html><head></head></html>").unwrap_err();
        assert!(matches!(err, Error::MissingField("channelId")));
    }

    #[test]
    fn test_transform_video() {
        let video = transform_video(VIDEO).unwrap();
        assert_eq!(video.id, "abc123");
        assert_eq!(video.title.as_deref(), Some("Ownership explained"));
        assert_eq!(video.description.as_deref(), Some("A talk"));
        assert_eq!(video.duration.as_deref(), Some("PT4M13S"));
        assert_eq!(video.genre.as_deref(), Some("Education"));
        assert!(video.family_friendly);
        assert_eq!(video.interaction_count, Some(98765));
        assert_eq!(video.tags, vec!["rust", "ownership"]);
    }

    #[test]
    fn test_transform_search() {
        let results = transform_search(SEARCH);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            SearchVideo {
                id: "v1".into(),
                title: Some("First".into()),
                channel: Some("Chan".into()),
                channel_id: Some("UC1".into()),
                published_text: Some("2 days ago".into()),
                view_count_text: Some("10 views".into()),
                length_text: Some("3:01".into()),
                thumbnail_url: Some("big.jpg".into()),
            }
        );
        assert_eq!(results[1].id, "v2");
        assert!(results[1].title.is_none());
    }

    #[test]
    fn test_transform_rss() {
        let videos = transform_rss(FEED).unwrap();
        assert_eq!(videos.len(), 2);

        let first = &videos[0];
        assert_eq!(first.id, "v1");
        assert_eq!(first.channel_id, "UC1");
        assert_eq!(first.title, "First & best");
        assert_eq!(first.link.as_deref(), Some("https://www.youtube.com/watch?v=v1"));
        assert_eq!(first.author.as_deref(), Some("Chan"));
        assert_eq!(
            first.published.map(|d| d.to_rfc3339()),
            Some("2024-03-01T10:00:00+00:00".to_owned())
        );
        assert_eq!(first.description.as_deref(), Some("About the first video"));
        assert_eq!(
            first.thumbnail_url.as_deref(),
            Some("https://i1.ytimg.com/vi/v1/hqdefault.jpg")
        );
        assert_eq!(first.views, Some(1234));

        assert_eq!(videos[1].id, "v2");
        assert!(videos[1].views.is_none());
    }
}
