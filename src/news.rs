//! Article text extraction.
use chrono::{DateTime, Utc};
use readability::extractor;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

use crate::crawler::Crawler;
use crate::errors::Result;
use crate::parsers::{self, element_text, findkeys, meta_content};
use crate::util::{collapse_whitespace, parse_datetime};

static TIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").expect("valid selector"));
static ITEMPROP_DATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemprop="datePublished"]"#).expect("valid selector")
});
static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["article", "main", "[role='main']", "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

/// The readable part of a news page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticleData {
    pub url: String,
    pub title: Option<String>,
    /// Plain text of the article body
    pub text: String,
    /// Cleaned HTML of the article body
    pub html: String,
    /// Lead image
    pub img: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
}

impl ArticleData {
    /// Extracts the article from downloaded markup.
    ///
    /// Never fails: pages readability cannot handle fall back to the text of
    /// the first `article`, `main` or `body` element.
    pub fn from_html(url: &str, html: &str) -> Self {
        let (title, text, body) = match readable(url, html) {
            Some(parts) => parts,
            None => fallback(html),
        };

        let doc = Html::parse_document(html);
        ArticleData {
            url: url.to_owned(),
            title: title.or_else(|| parsers::page_title(&doc)),
            text,
            html: body,
            img: lead_image(&doc),
            publish_date: publish_date(&doc),
        }
    }

    /// Downloads `url` and extracts its article.
    pub async fn from_url(url: &str, crawler: &dyn Crawler) -> Result<Self> {
        let rsp = crawler.get(url).await?.error_for_status()?;
        Ok(Self::from_html(url, &rsp.text()))
    }
}

fn readable(url: &str, html: &str) -> Option<(Option<String>, String, String)> {
    let url = Url::parse(url).ok()?;
    match extractor::extract(&mut html.as_bytes(), &url) {
        Ok(product) => {
            let text = collapse_whitespace(&product.text).into_owned();
            if text.is_empty() {
                return None;
            }
            let title = Some(product.title).filter(|t| !t.trim().is_empty());
            Some((title, text, product.content))
        }
        Err(e) => {
            tracing::debug!(url = %url, error = ?e, "Readability failed, using fallback");
            None
        }
    }
}

fn fallback(html: &str) -> (Option<String>, String, String) {
    let doc = Html::parse_document(html);
    for selector in CONTENT_ROOTS.iter() {
        if let Some(el) = doc.select(selector).next() {
            if let Some(text) = element_text(&el) {
                return (None, text, el.inner_html());
            }
        }
    }
    (None, String::new(), String::new())
}

fn lead_image(doc: &Html) -> Option<String> {
    meta_content(doc, "property", "og:image")
        .or_else(|| meta_content(doc, "name", "twitter:image"))
        .or_else(|| meta_content(doc, "property", "twitter:image"))
}

fn publish_date(doc: &Html) -> Option<DateTime<Utc>> {
    let from_meta = ["article:published_time", "og:published_time"]
        .iter()
        .find_map(|p| meta_content(doc, "property", p))
        .or_else(|| {
            ["date", "pubdate", "publishdate", "dc.date.issued"]
                .iter()
                .find_map(|n| meta_content(doc, "name", n))
        });
    if let Some(date) = from_meta.as_deref().and_then(parse_datetime) {
        return Some(date);
    }

    let from_ld_json = parsers::extract_ld_json(doc).ok().and_then(|ld| {
        findkeys(&ld, "datePublished")
            .into_iter()
            .find_map(Value::as_str)
            .and_then(parse_datetime)
    });
    if from_ld_json.is_some() {
        return from_ld_json;
    }

    doc.select(&ITEMPROP_DATE)
        .find_map(|el| {
            el.value()
                .attr("content")
                .or_else(|| el.value().attr("datetime"))
                .and_then(parse_datetime)
        })
        .or_else(|| {
            doc.select(&TIME)
                .find_map(|el| el.value().attr("datetime").and_then(parse_datetime))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::LocalCrawler;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paragraph() -> String {
        "The city council approved the new transit plan on Monday, \
         expanding bus routes across the northern districts. "
            .repeat(8)
    }

    #[test]
    fn test_from_html_meta_fields() {
        let html = format!(
            r#"<html><head><title>Transit plan approved</title>
            <meta property="og:image" content="https://example.com/lead.jpg">
            <meta property="article:published_time" content="2024-03-05T10:20:30Z">
            </head><body><article><h1>Transit plan approved</h1><p>{}</p></article></body></html>"#,
            paragraph()
        );
        let article = ArticleData::from_html("https://example.com/news/transit", &html);

        assert_eq!(article.url, "https://example.com/news/transit");
        assert_eq!(article.img.as_deref(), Some("https://example.com/lead.jpg"));
        assert_eq!(
            article.publish_date.map(|d| d.to_rfc3339()),
            Some("2024-03-05T10:20:30+00:00".to_owned())
        );
        assert!(article.text.contains("transit plan"));
        assert!(article.title.is_some());
    }

    #[test]
    fn test_publish_date_from_ld_json() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context":"https://schema.org","@graph":[{"@type":"NewsArticle","datePublished":"2023-11-02T08:00:00+01:00"}]}
            </script></head><body><p>short</p></body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            publish_date(&doc).map(|d| d.to_rfc3339()),
            Some("2023-11-02T07:00:00+00:00".to_owned())
        );
    }

    #[test]
    fn test_publish_date_from_time_tag() {
        let doc = Html::parse_document(
            r#"<html><body><time datetime="2022-01-15">Jan 15</time></body></html>"#,
        );
        assert_eq!(
            publish_date(&doc).map(|d| d.date_naive().to_string()),
            Some("2022-01-15".to_owned())
        );
    }

    #[test]
    fn test_fallback_picks_first_content_root() {
        let (title, text, html) =
            fallback("<html><body><nav>menu</nav><main><p>Hello   world</p></main></body></html>");
        assert!(title.is_none());
        assert_eq!(text, "Hello world");
        assert!(html.contains("<p>"));
    }

    #[test]
    fn test_from_html_empty_page() {
        let article = ArticleData::from_html("https://example.com/", "");
        assert!(article.img.is_none());
        assert!(article.publish_date.is_none());
    }

    #[tokio::test]
    async fn test_from_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    format!(
                        "<html><body><article><p>{}</p></article></body></html>",
                        paragraph()
                    ),
                    "text/html",
                ),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let crawler = LocalCrawler::new().unwrap();
        let article = ArticleData::from_url(&format!("{}/story", server.uri()), &crawler)
            .await
            .unwrap();
        assert!(article.text.contains("northern districts"));

        let err = ArticleData::from_url(&format!("{}/gone", server.uri()), &crawler)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Crawling { status: 410, .. }
        ));
    }
}
