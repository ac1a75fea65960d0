//! Facebook page and post URLs.
use serde::Serialize;
use url::Url;

use crate::crawler::Crawler;
use crate::errors::{Error, Result};
use crate::web::{download_rendered, WebDocument};

/// What a Facebook URL points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FbLink {
    pub url: String,
    pub is_profile: bool,
    pub is_photo: bool,
    /// Numeric id of the profile or post, when the URL carries one
    pub id: Option<String>,
    /// Vanity name of the page
    pub alias: Option<String>,
}

impl FbLink {
    /// Classifies a Facebook URL.
    ///
    /// ```
    /// use datahtml::facebook::FbLink;
    ///
    /// let link = FbLink::from_url("https://www.facebook.com/profile.php?id=100076743798090").unwrap();
    /// assert!(link.is_profile);
    /// assert_eq!(link.id.as_deref(), Some("100076743798090"));
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim()).map_err(|_| Error::UrlParsing(url.to_owned()))?;
        let path = parsed.path();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let query_id = || {
            parsed
                .query_pairs()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.into_owned())
        };

        let mut link = FbLink {
            url: url.to_owned(),
            is_profile: false,
            is_photo: false,
            id: None,
            alias: None,
        };

        if path.contains("people") {
            // /people/<alias>/<id>/
            link.alias = segments.get(1).map(|s| s.to_string());
            link.id = segments.get(2).map(|s| s.to_string());
            link.is_profile = true;
        } else if path.contains("story.php") {
            link.id = query_id();
        } else if path.contains("photo") {
            link.is_photo = true;
        } else if path.contains("posts") || path.contains("videos") {
            link.alias = segments.first().map(|s| s.to_string());
            link.id = segments.last().map(|s| s.to_string());
        } else if path.contains("profile.php") {
            link.id = query_id();
            link.is_profile = true;
        } else if segments.len() == 1 {
            link.alias = Some(segments[0].to_owned());
            link.is_profile = true;
        }

        Ok(link)
    }
}

/// A downloaded Facebook page.
#[derive(Debug, Clone)]
pub struct Facebook {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: FbLink,
    pub web: WebDocument,
}

/// Rewrites any Facebook host (`m.`, `web.`, `fb.com`) to `www.facebook.com`.
pub fn normalize_fb_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim()).map_err(|_| Error::UrlParsing(url.to_owned()))?;
    let mut normalized = format!("https://www.facebook.com{}", parsed.path());
    if let Some(query) = parsed.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    Ok(normalized)
}

/// Downloads a Facebook page.
///
/// Facebook needs a rendering crawler; the service's JSON envelope is
/// unwrapped when present.
pub async fn download_fb(url: &str, crawler: &dyn Crawler) -> Result<Facebook> {
    let norm = normalize_fb_url(url)?;
    let link = FbLink::from_url(&norm)?;
    let web = download_rendered(&norm, crawler).await?;

    Ok(Facebook {
        title: web.title(),
        description: web.meta_og(None).remove("description"),
        url: norm,
        link,
        web,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlResponse, Headers};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const STORY: &str = "https://www.facebook.com/story.php?story_fbid=pfbid02G3gFCXMZ5kgXUkoZYFERAztJoaNzJud93tt3cQ8WZ1ghxeEPydfMAsDLGoYTeFkgl&id=100095183804155&mibextid=Nif5oz'";
    const PEOPLE: &str = "https://www.facebook.com/people/Gabriela-Ford-San-Nicol%C3%A1s/100088589533130/";
    const POST: &str = "https://www.facebook.com/grandcarsa/posts/quer%C3%A9s-cumplir-tu-sue%C3%B1o-de-tener-una-jeep-ahora-es-m%C3%A1s-f%C3%A1cil-con-jeep-planrenega/982542428959000";
    const ALIAS: &str = "https://www.facebook.com/burdeosautoplan.larioja";
    const PROFILE: &str = "https://www.facebook.com/profile.php?id=100076743798090";

    #[test]
    fn test_story() {
        let link = FbLink::from_url(STORY).unwrap();
        assert!(!link.is_profile);
        assert_eq!(link.id.as_deref(), Some("100095183804155"));
        assert!(link.alias.is_none());
    }

    #[test]
    fn test_people() {
        let link = FbLink::from_url(PEOPLE).unwrap();
        assert!(link.is_profile);
        assert_eq!(link.alias.as_deref(), Some("Gabriela-Ford-San-Nicol%C3%A1s"));
        assert_eq!(link.id.as_deref(), Some("100088589533130"));
    }

    #[test]
    fn test_post() {
        let link = FbLink::from_url(POST).unwrap();
        assert!(!link.is_profile);
        assert_eq!(link.alias.as_deref(), Some("grandcarsa"));
        assert_eq!(link.id.as_deref(), Some("982542428959000"));
    }

    #[test]
    fn test_alias_and_profile() {
        let alias = FbLink::from_url(ALIAS).unwrap();
        assert!(alias.is_profile);
        assert_eq!(alias.alias.as_deref(), Some("burdeosautoplan.larioja"));

        let profile = FbLink::from_url(PROFILE).unwrap();
        assert!(profile.is_profile);
        assert_eq!(profile.id.as_deref(), Some("100076743798090"));
    }

    #[test]
    fn test_photo() {
        let link = FbLink::from_url("https://www.facebook.com/photo/?fbid=123").unwrap();
        assert!(link.is_photo);
        assert!(!link.is_profile);
        assert!(link.id.is_none());
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(FbLink::from_url("nope"), Err(Error::UrlParsing(_))));
    }

    #[test]
    fn test_normalize_fb_url() {
        assert_eq!(
            normalize_fb_url("https://m.facebook.com/profile.php?id=42").unwrap(),
            "https://www.facebook.com/profile.php?id=42"
        );
        assert_eq!(
            normalize_fb_url("http://fb.com/somepage").unwrap(),
            "https://www.facebook.com/somepage"
        );
    }

    /// Answers every request with the same body and records the URLs asked for.
    struct StubCrawler {
        body: String,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Crawler for StubCrawler {
        async fn get_with(
            &self,
            url: &str,
            _headers: &Headers,
            _timeout: Duration,
        ) -> Result<CrawlResponse> {
            self.requested.lock().unwrap().push(url.to_owned());
            Ok(CrawlResponse {
                url: url.to_owned(),
                content: self.body.clone().into_bytes(),
                headers: HashMap::from([("content-type".to_owned(), "application/json".to_owned())]),
                status_code: 200,
            })
        }
    }

    #[tokio::test]
    async fn test_download_fb_unwraps_service_envelope() {
        let crawler = StubCrawler {
            body: json!({
                "content": "<html><head><title>Some Page</title>\
                    <meta property=\"og:description\" content=\"A page\"></head></html>",
                "status": 200
            })
            .to_string(),
            requested: Mutex::new(Vec::new()),
        };

        let fb = download_fb("https://m.facebook.com/somepage", &crawler).await.unwrap();
        assert_eq!(
            *crawler.requested.lock().unwrap(),
            vec!["https://www.facebook.com/somepage".to_owned()]
        );
        assert_eq!(fb.url, "https://www.facebook.com/somepage");
        assert_eq!(fb.title.as_deref(), Some("Some Page"));
        assert_eq!(fb.description.as_deref(), Some("A page"));
        assert!(fb.link.is_profile);
        assert_eq!(fb.link.alias.as_deref(), Some("somepage"));
    }
}
