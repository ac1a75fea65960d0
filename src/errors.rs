use thiserror::Error;

/// Errors raised while crawling pages and extracting data from them.
///
/// Transport problems, missing markup and parse failures all end up here.
/// The URL index and the config loader carry their own error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The string could not be parsed as an absolute URL with a host
    #[error("invalid URL: {0}")]
    UrlParsing(String),

    /// No `application/ld+json` script could be parsed
    #[error("ld+json script not found")]
    LdJsonNotFound,

    /// Network-level failure (DNS, connection, TLS, etc.)
    #[error("HTTP request failed: {0}")]
    CrawlHttp(String),

    /// A response with an unexpected status code
    #[error("crawling {url} failed with status {status}")]
    Crawling { url: String, status: u16 },

    #[error("request to {0} timed out")]
    Timeout(String),

    /// Response body exceeded the configured size limit
    #[error("response larger than {0} bytes")]
    ResponseTooLarge(usize),

    /// Response was cut short (fewer bytes than Content-Length)
    #[error("incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },

    #[error("robots.txt not found for {0}")]
    RobotsTxtNotFound(String),

    /// The response was expected to be an RSS/Atom/XML document
    #[error("no XML content at {0}")]
    XmlContentNotFound(String),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("feed parse error: {0}")]
    Feed(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field required to build a record was absent from the document
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl Error {
    /// Map a reqwest error into the matching crawl error.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(url.to_owned())
        } else {
            Error::CrawlHttp(err.to_string())
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
