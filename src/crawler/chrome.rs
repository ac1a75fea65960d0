//! Client for the chrome_crawler rendering service (v6 API).
//!
//! The service renders pages in a headless browser (`/v6/chrome`), proxies
//! plain HTTP requests (`/v6/axios`), fetches images (`/v6/image`) and runs
//! search engine queries (`/v6/google`, `/v6/duckduckgo`). Every call is
//! authenticated with a bearer token.
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use super::{CrawlResponse, Crawler, Headers};
use crate::config::Config;
use crate::errors::{Error, Result};
use crate::parsers::{element_text, parse_url, text2soup};
use crate::types::ParsedUrl;
use scraper::Selector;

const VERSION: &str = "v6";
const DEFAULT_SERVICE: &str = "http://localhost:3000";
const AXIOS_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Extra time granted to the service on top of the page timeout.
const SERVICE_GRACE: Duration = Duration::from_secs(10);

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proxy {
    pub server: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewPort {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewPort {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    pub longitude: f64,
    pub latitude: f64,
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self {
            longitude: 40.697631,
            latitude: -74.144485,
        }
    }
}

/// Browser locale, timezone and device emulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emulation {
    pub locale: String,
    pub timezone_id: String,
    pub is_mobile: bool,
    pub viewport: ViewPort,
    pub geo_enabled: bool,
    pub geolocation: GeoLocation,
}

impl Default for Emulation {
    fn default() -> Self {
        Self {
            locale: "en-US".to_owned(),
            timezone_id: "America/New_York".to_owned(),
            is_mobile: false,
            viewport: ViewPort::default(),
            geo_enabled: false,
            geolocation: GeoLocation::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Browser {
    pub emulation: Option<Emulation>,
    pub proxy: Option<Proxy>,
}

impl Default for Browser {
    fn default() -> Self {
        Self {
            emulation: Some(Emulation::default()),
            proxy: None,
        }
    }
}

/// Rendering options sent with every `/v6/chrome` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeConfig {
    /// Seconds the browser may spend loading the page
    pub ts: u64,
    /// CSS selector to wait for before capturing the DOM
    pub wait_element: Option<String>,
    pub screenshot: bool,
    pub use_cookies: bool,
    pub clean_cookies: bool,
    pub cookie_id: Option<String>,
    pub headers: HashMap<String, Value>,
    pub browser: Option<Browser>,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            ts: 120,
            wait_element: None,
            screenshot: false,
            use_cookies: false,
            clean_cookies: false,
            cookie_id: None,
            headers: HashMap::new(),
            browser: Some(Browser::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchGoogle {
    pub text: String,
    pub ts: u64,
    pub region: String,
    pub time_filter: Option<String>,
    pub screenshot: bool,
    pub use_cookies: bool,
    pub cookie_id: Option<String>,
    pub browser: Option<Browser>,
}

impl SearchGoogle {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            ts: 120,
            region: "Argentina".to_owned(),
            time_filter: None,
            screenshot: false,
            use_cookies: true,
            cookie_id: Some("default".to_owned()),
            browser: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDuck {
    pub text: String,
    pub ts: u64,
    pub region: String,
    pub time_filter: Option<String>,
    pub screenshot: bool,
    pub use_cookies: bool,
    pub cookie_id: Option<String>,
    pub browser: Option<Browser>,
}

impl SearchDuck {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            ts: 120,
            region: "ar-es".to_owned(),
            time_filter: None,
            screenshot: false,
            use_cookies: true,
            cookie_id: Some("default".to_owned()),
            browser: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct AxiosRequest<'a> {
    url: &'a str,
    ts: u64,
    headers: HashMap<String, String>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Full answer of a `/v6/chrome` render.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeResponse {
    pub fullurl: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub headers: HashMap<String, Value>,
    pub status: u16,
    #[serde(default)]
    pub full_loaded: bool,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cookie_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub fullurl: String,
    pub headers: HashMap<String, Value>,
    pub status: Option<u16>,
    /// Base64 encoded image
    pub image: Option<String>,
    pub error: Option<String>,
}

/// First external link of a DuckDuckGo result.
#[derive(Debug, Clone, Serialize)]
pub struct DuckLink {
    pub link: ParsedUrl,
    pub text: String,
    pub from_search: String,
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Clone)]
struct Service {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    timeout: Duration,
}

impl Service {
    fn new(base_url: &str, token: SecretString, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::CrawlHttp(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            timeout,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, VERSION, name)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        payload: &T,
        timeout: Duration,
    ) -> Result<CrawlResponse> {
        let request = self
            .http
            .post(endpoint)
            .bearer_auth(self.token.expose_secret())
            .json(payload)
            .send();
        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| Error::Timeout(endpoint.to_owned()))?
            .map_err(|e| Error::from_reqwest(endpoint, e))?;
        into_crawl_response(endpoint, response).await
    }

    async fn get(&self, url: &str) -> Result<CrawlResponse> {
        let request = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| Error::Timeout(url.to_owned()))?
            .map_err(|e| Error::from_reqwest(url, e))?;
        into_crawl_response(url, response).await
    }

    async fn probe(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.http.get(&self.base_url).send()).await {
            Ok(Ok(rsp)) => rsp.status() == reqwest::StatusCode::OK,
            Ok(Err(e)) => {
                tracing::debug!(service = %self.base_url, error = %e, "Service probe failed");
                false
            }
            Err(_) => false,
        }
    }
}

async fn into_crawl_response(url: &str, response: reqwest::Response) -> Result<CrawlResponse> {
    let status_code = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();
    let content = response
        .bytes()
        .await
        .map_err(|e| Error::from_reqwest(url, e))?
        .to_vec();
    Ok(CrawlResponse {
        url: url.to_owned(),
        content,
        headers,
        status_code,
    })
}

/// Lowercased string view of a JSON headers object.
fn json_headers(value: Option<&Value>) -> HashMap<String, String> {
    let Some(Value::Object(map)) = value else {
        return HashMap::new();
    };
    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.to_lowercase(), v)
        })
        .collect()
}

fn json_headers_raw(value: Option<&Value>) -> HashMap<String, Value> {
    match value {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => HashMap::new(),
    }
}

fn env_token() -> SecretString {
    SecretString::from(std::env::var("CHROME_TOKEN").unwrap_or_default())
}

fn env_service() -> String {
    std::env::var("CHROME_SERVICE").unwrap_or_else(|_| DEFAULT_SERVICE.to_owned())
}

// ============================================================================
// ChromeCrawler
// ============================================================================

/// Renders pages with headless Chrome through the service.
#[derive(Debug, Clone)]
pub struct ChromeCrawler {
    service: Service,
    pub config: ChromeConfig,
    pub proxy: Option<Proxy>,
}

impl ChromeCrawler {
    pub fn new(base_url: &str, token: SecretString, config: ChromeConfig) -> Result<Self> {
        Ok(Self {
            service: Service::new(base_url, token, Duration::from_secs(60))?,
            config,
            proxy: None,
        })
    }

    /// Reads `CHROME_SERVICE` and `CHROME_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Self::new(&env_service(), env_token(), ChromeConfig::default())
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let service = config.chrome_service.as_deref().unwrap_or(DEFAULT_SERVICE);
        let token = SecretString::from(config.chrome_token.clone().unwrap_or_default());
        Ok(Self::new(service, token, ChromeConfig::default())?
            .with_service_timeout(config.timeout()))
    }

    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_service_timeout(mut self, timeout: Duration) -> Self {
        self.service.timeout = timeout;
        self
    }

    /// Posts the render request and returns the service's JSON answer as-is.
    pub async fn get_raw(
        &self,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<CrawlResponse> {
        let mut payload = serde_json::to_value(&self.config)?;
        if let Value::Object(map) = &mut payload {
            map.insert("url".to_owned(), Value::String(url.to_owned()));
            if !headers.is_empty() {
                map.insert("headers".to_owned(), serde_json::to_value(headers)?);
            }
            if let Some(proxy) = &self.proxy {
                map.insert("proxy".to_owned(), serde_json::to_value(proxy)?);
            }
        }

        let endpoint = self.service.endpoint("chrome");
        let mut rsp = self
            .service
            .post(&endpoint, &payload, timeout + SERVICE_GRACE)
            .await?;
        rsp.url = url.to_owned();
        Ok(rsp)
    }

    pub async fn get_chrome(
        &self,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<ChromeResponse> {
        let rsp = self.get_raw(url, headers, timeout).await?;
        Self::as_chrome(&rsp)
    }

    /// Decodes a raw service answer.
    ///
    /// A non-200 answer becomes a response with `full_loaded = false` and
    /// the service's `error` message (`"error"` when it gave none).
    pub fn as_chrome(rsp: &CrawlResponse) -> Result<ChromeResponse> {
        if rsp.status_code == 200 {
            return rsp.json_as();
        }

        let error = rsp
            .json()
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| "error".to_owned());
        Ok(ChromeResponse {
            fullurl: rsp.url.clone(),
            content: rsp.text().into_owned(),
            headers: rsp
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            status: rsp.status_code,
            full_loaded: false,
            screenshot: None,
            error: Some(error),
            cookie_id: None,
        })
    }

    pub async fn google_search(&self, req: &SearchGoogle) -> Result<CrawlResponse> {
        let endpoint = self.service.endpoint("google");
        self.service
            .post(&endpoint, req, self.service.timeout)
            .await
    }

    pub async fn duckduckgo_search(&self, req: &SearchDuck) -> Result<CrawlResponse> {
        let endpoint = self.service.endpoint("duckduckgo");
        self.service
            .post(&endpoint, req, self.service.timeout)
            .await
    }

    /// True when the service root answers 200.
    pub async fn probe(&self) -> bool {
        self.service.probe().await
    }
}

#[async_trait]
impl Crawler for ChromeCrawler {
    fn default_timeout(&self) -> Duration {
        self.service.timeout
    }

    /// Returns the rendered HTML with the target page's headers and status
    /// when the service reports them.
    async fn get_with(
        &self,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<CrawlResponse> {
        let raw = self.get_raw(url, headers, timeout).await?;
        let data = raw.json()?;
        let content = data
            .get("content")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("content"))?;

        let target_headers = json_headers(data.get("headers"));
        let status_code = data
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(raw.status_code);

        Ok(CrawlResponse {
            url: raw.url,
            content: content.as_bytes().to_vec(),
            headers: if target_headers.is_empty() {
                raw.headers
            } else {
                target_headers
            },
            status_code,
        })
    }
}

// ============================================================================
// AxiosCrawler
// ============================================================================

/// Plain HTTP requests proxied through the service (no rendering).
#[derive(Debug, Clone)]
pub struct AxiosCrawler {
    service: Service,
}

impl AxiosCrawler {
    pub fn new(base_url: &str, token: SecretString) -> Result<Self> {
        Ok(Self {
            service: Service::new(base_url, token, Duration::from_secs(60))?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&env_service(), env_token())
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let service = config.chrome_service.as_deref().unwrap_or(DEFAULT_SERVICE);
        let token = SecretString::from(config.chrome_token.clone().unwrap_or_default());
        let mut crawler = Self::new(service, token)?;
        crawler.service.timeout = config.timeout();
        Ok(crawler)
    }

    pub async fn image(&self, url: &str) -> Result<ImageResponse> {
        let endpoint = url::Url::parse_with_params(&self.service.endpoint("image"), [("url", url)])
            .map_err(|_| Error::UrlParsing(self.service.base_url.clone()))?;
        let rsp = self.service.get(endpoint.as_str()).await?;
        let data = rsp.json()?;
        Ok(ImageResponse {
            fullurl: url.to_owned(),
            headers: json_headers_raw(data.get("headers")),
            status: data
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok()),
            image: data.get("image").and_then(Value::as_str).map(str::to_owned),
            error: data.get("error").and_then(Value::as_str).map(str::to_owned),
        })
    }

    pub async fn probe(&self) -> bool {
        self.service.probe().await
    }
}

#[async_trait]
impl Crawler for AxiosCrawler {
    fn default_timeout(&self) -> Duration {
        self.service.timeout
    }

    async fn get_with(
        &self,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<CrawlResponse> {
        let headers = if headers.is_empty() {
            HashMap::from([("User-Agent".to_owned(), AXIOS_UA.to_owned())])
        } else {
            headers.clone()
        };
        let req = AxiosRequest {
            url,
            ts: timeout.as_secs(),
            headers,
        };

        let endpoint = self.service.endpoint("axios");
        let raw = self
            .service
            .post(&endpoint, &req, self.service.timeout.max(timeout + SERVICE_GRACE))
            .await?;
        let data = raw.json()?;
        let content = data
            .get("content")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("content"))?;

        Ok(CrawlResponse {
            url: url.to_owned(),
            content: content.as_bytes().to_vec(),
            headers: json_headers(data.get("headers")),
            status_code: data
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(raw.status_code),
        })
    }
}

// ============================================================================
// DuckDuckGo
// ============================================================================

static ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("valid article selector"));
static HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[href]").expect("valid href selector"));

/// Extracts the first non-DuckDuckGo link of each result `<article>`.
pub fn process_duckduck(content: &str, from_search: &str) -> Vec<DuckLink> {
    let doc = text2soup(content);
    let mut found = Vec::new();

    for article in doc.select(&ARTICLE) {
        let text = element_text(&article).unwrap_or_default();
        let link = article
            .select(&HREF)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| parse_url(href).ok())
            .find(|u| !u.netloc.is_empty() && u.netloc != "duckduckgo.com");

        if let Some(link) = link {
            found.push(DuckLink {
                link,
                text,
                from_search: from_search.to_owned(),
            });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chrome(server: &MockServer) -> ChromeCrawler {
        ChromeCrawler::new(
            &server.uri(),
            SecretString::from("tkn".to_owned()),
            ChromeConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_config_serializes_camel_case() {
        let value = serde_json::to_value(ChromeConfig::default()).unwrap();
        assert_eq!(value["ts"], 120);
        assert_eq!(value["useCookies"], false);
        assert_eq!(value["waitElement"], Value::Null);
        assert_eq!(value["browser"]["emulation"]["timezoneId"], "America/New_York");
        assert_eq!(value["browser"]["emulation"]["viewport"]["width"], 1280);
        assert_eq!(value["browser"]["emulation"]["isMobile"], false);
    }

    #[tokio::test]
    async fn test_chrome_get_unwraps_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v6/chrome"))
            .and(header("authorization", "Bearer tkn"))
            .and(body_partial_json(json!({"url": "https://example.com", "ts": 120})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fullurl": "https://example.com",
                "content": "<html><body>rendered</body></html>",
                "headers": {"Content-Type": "text/html"},
                "status": 200,
                "fullLoaded": true
            })))
            .mount(&server)
            .await;

        let rsp = chrome(&server).get("https://example.com").await.unwrap();
        assert_eq!(rsp.text(), "<html><body>rendered</body></html>");
        assert_eq!(rsp.url, "https://example.com");
        assert_eq!(rsp.content_type(), "text/html");
    }

    #[tokio::test]
    async fn test_chrome_get_missing_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .mount(&server)
            .await;

        let err = chrome(&server).get("https://example.com").await.unwrap_err();
        assert!(matches!(err, Error::MissingField("content")));
    }

    #[tokio::test]
    async fn test_get_chrome_full_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v6/chrome"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fullurl": "https://example.com/",
                "content": "<html></html>",
                "headers": {},
                "status": 200,
                "fullLoaded": true,
                "screenshot": "aGVsbG8=",
                "cookieId": "default"
            })))
            .mount(&server)
            .await;

        let rsp = chrome(&server)
            .get_chrome("https://example.com/", &Headers::new(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(rsp.full_loaded);
        assert_eq!(rsp.screenshot.as_deref(), Some("aGVsbG8="));
        assert_eq!(rsp.cookie_id.as_deref(), Some("default"));
    }

    #[test]
    fn test_as_chrome_error_response() {
        let rsp = CrawlResponse {
            url: "https://example.com".into(),
            content: br#"{"error": "timeout waiting page"}"#.to_vec(),
            headers: HashMap::new(),
            status_code: 504,
        };
        let chrome = ChromeCrawler::as_chrome(&rsp).unwrap();
        assert!(!chrome.full_loaded);
        assert_eq!(chrome.status, 504);
        assert_eq!(chrome.error.as_deref(), Some("timeout waiting page"));

        let rsp = CrawlResponse {
            status_code: 502,
            content: b"bad gateway".to_vec(),
            ..rsp
        };
        let chrome = ChromeCrawler::as_chrome(&rsp).unwrap();
        assert_eq!(chrome.error.as_deref(), Some("error"));
        assert_eq!(chrome.content, "bad gateway");
    }

    #[tokio::test]
    async fn test_proxy_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"proxy": {"server": "http://proxy:8080"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let crawler = chrome(&server).with_proxy(Proxy {
            server: "http://proxy:8080".into(),
            username: None,
            password: None,
        });
        let rsp = crawler.get("https://example.com").await.unwrap();
        assert_eq!(rsp.text(), "ok");
    }

    #[tokio::test]
    async fn test_google_and_duck_search_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v6/google"))
            .and(body_partial_json(json!({"text": "rust", "region": "Argentina", "useCookies": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string("google"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v6/duckduckgo"))
            .and(body_partial_json(json!({"text": "rust", "region": "ar-es"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("duck"))
            .mount(&server)
            .await;

        let crawler = chrome(&server);
        let g = crawler.google_search(&SearchGoogle::new("rust")).await.unwrap();
        assert_eq!(g.text(), "google");
        assert!(g.url.ends_with("/v6/google"));
        let d = crawler.duckduckgo_search(&SearchDuck::new("rust")).await.unwrap();
        assert_eq!(d.text(), "duck");
    }

    #[tokio::test]
    async fn test_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(chrome(&server).probe().await);

        let down = ChromeCrawler::new(
            "http://127.0.0.1:9",
            SecretString::from(String::new()),
            ChromeConfig::default(),
        )
        .unwrap();
        assert!(!down.probe().await);
    }

    #[tokio::test]
    async fn test_axios_get() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v6/axios"))
            .and(body_partial_json(json!({
                "url": "https://example.com/feed",
                "headers": {"User-Agent": AXIOS_UA}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": "<rss></rss>",
                "headers": {"Content-Type": "application/rss+xml"},
                "status": 200
            })))
            .mount(&server)
            .await;

        let axios = AxiosCrawler::new(&server.uri(), SecretString::from("t".to_owned())).unwrap();
        let rsp = axios.get("https://example.com/feed").await.unwrap();
        assert_eq!(rsp.text(), "<rss></rss>");
        assert!(rsp.is_xml());
        assert_eq!(rsp.status_code, 200);
    }

    #[tokio::test]
    async fn test_from_config_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v6/axios"))
            .and(body_partial_json(json!({"url": "https://example.com/", "ts": 7})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": "ok",
                "status": 200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            timeout_secs: 7,
            chrome_service: Some(server.uri()),
            ..Config::default()
        };
        let chrome = ChromeCrawler::from_config(&config).unwrap();
        assert_eq!(chrome.default_timeout(), Duration::from_secs(7));

        let axios = AxiosCrawler::from_config(&config).unwrap();
        assert_eq!(axios.default_timeout(), Duration::from_secs(7));
        let rsp = axios.get("https://example.com/").await.unwrap();
        assert_eq!(rsp.text(), "ok");
    }

    #[tokio::test]
    async fn test_axios_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/image"))
            .and(query_param("url", "https://example.com/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "headers": {"content-type": "image/png"},
                "status": 200,
                "image": "iVBORw0KGgo="
            })))
            .mount(&server)
            .await;

        let axios = AxiosCrawler::new(&server.uri(), SecretString::from("t".to_owned())).unwrap();
        let img = axios.image("https://example.com/a.png").await.unwrap();
        assert_eq!(img.status, Some(200));
        assert_eq!(img.image.as_deref(), Some("iVBORw0KGgo="));
        assert!(img.error.is_none());
    }

    #[test]
    fn test_process_duckduck() {
        let html = r#"<html><body>
            <article>
                <a href="https://duckduckgo.com/y.js?ad=1">ad</a>
                <a href="https://www.autos.com.ar/usados">Autos usados</a>
                <a href="https://second.com/">second</a>
            </article>
            <article><a href="/relative">only relative</a></article>
            <article><span data-href="x"></span><a href="https://foo.org/x">Foo</a></article>
        </body></html>"#;

        let links = process_duckduck(html, "autos usados");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].link.fullurl, "https://www.autos.com.ar/usados");
        assert!(links[0].text.contains("Autos usados"));
        assert_eq!(links[0].from_search, "autos usados");
        assert_eq!(links[1].link.netloc, "foo.org");
    }
}
