//! Instagram post and profile pages.
use serde_json::{Map, Value};

use crate::crawler::Crawler;
use crate::errors::Result;
use crate::web::{download_rendered, WebDocument};

#[derive(Debug, Clone)]
pub struct Instagram {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Caption of the post
    pub body: Option<String>,
    pub profile_url: Option<String>,
    pub name: Option<String>,
    /// The `@handle` of the author
    pub alternate_name: Option<String>,
    pub web: WebDocument,
}

impl Instagram {
    /// Reads the title, the OG description and the structured data
    /// (`articleBody` and `author`) embedded in the page.
    pub fn from_webdoc(web: WebDocument) -> Self {
        let post = web
            .json()
            .iter()
            .chain(web.ld_json().ok().as_ref())
            .find_map(|v| object_with(v, "articleBody").cloned());

        let field = |obj: &Map<String, Value>, key: &str| {
            obj.get(key).and_then(Value::as_str).map(str::to_owned)
        };
        let author = post
            .as_ref()
            .and_then(|p| p.get("author"))
            .and_then(|a| match a {
                Value::Array(list) => list.first(),
                other => Some(other),
            })
            .and_then(Value::as_object);

        Instagram {
            url: web.url.fullurl.clone(),
            title: web.title(),
            description: web.meta_og(None).remove("description"),
            body: post.as_ref().and_then(|p| field(p, "articleBody")),
            profile_url: author.and_then(|a| field(a, "url")),
            name: author.and_then(|a| field(a, "name")),
            alternate_name: author.and_then(|a| field(a, "alternateName")),
            web,
        }
    }
}

/// The first object, depth first, that has `key`.
fn object_with<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(map) if map.contains_key(key) => Some(map),
        Value::Object(map) => map.values().find_map(|v| object_with(v, key)),
        Value::Array(list) => list.iter().find_map(|v| object_with(v, key)),
        _ => None,
    }
}

/// Downloads an Instagram page, unwrapping the rendering service envelope
/// when present.
pub async fn download_ig(url: &str, crawler: &dyn Crawler) -> Result<Instagram> {
    let web = download_rendered(url, crawler).await?;
    Ok(Instagram::from_webdoc(web))
}
