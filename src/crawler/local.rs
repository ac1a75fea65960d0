use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

use super::{CrawlResponse, Crawler, Headers};
use crate::config::Config;
use crate::defaults::{AGENT, DEFAULT_TIMEOUT, MAX_BODY_SIZE};
use crate::errors::{Error, Result};

/// Downloads directly with `reqwest`, following redirects.
///
/// Sends the default browser user agent unless the request headers carry
/// their own. With retries enabled, 429 and 5xx responses and truncated
/// bodies are retried with exponential backoff (`delay`, `2 * delay`,
/// `4 * delay`, ...).
#[derive(Debug, Clone)]
pub struct LocalCrawler {
    client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
    max_body_size: usize,
    timeout: Duration,
}

impl LocalCrawler {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::CrawlHttp(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Wraps an already configured client (caller controls proxies, TLS, etc.)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_retries: 0,
            retry_delay: Duration::from_secs(1),
            max_body_size: MAX_BODY_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::with_user_agent(&config.user_agent)?
            .with_retries(config.max_retries, Duration::from_secs(1))
            .with_max_body_size(config.max_body_bytes)
            .with_timeout(config.timeout()))
    }

    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = delay;
        self
    }

    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Timeout applied by [`Crawler::get`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn backoff(&self, retry_count: u32) -> Duration {
        self.retry_delay.saturating_mul(2u32.saturating_pow(retry_count))
    }
}

#[async_trait]
impl Crawler for LocalCrawler {
    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_with(
        &self,
        url: &str,
        headers: &Headers,
        timeout: Duration,
    ) -> Result<CrawlResponse> {
        let mut retry_count = 0;

        loop {
            let mut request = self.client.get(url).timeout(timeout);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            let response = tokio::time::timeout(timeout, request.send())
                .await
                .map_err(|_| Error::Timeout(url.to_owned()))?
                .map_err(|e| Error::from_reqwest(url, e))?;

            let status = response.status();
            let retryable =
                status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && retry_count < self.max_retries {
                let delay = self.backoff(retry_count);
                tracing::warn!(
                    url = %url,
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable status, backing off"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            let final_url = response.url().to_string();
            let mut response_headers: HashMap<String, String> = HashMap::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    response_headers
                        .entry(name.as_str().to_owned())
                        .and_modify(|v| {
                            v.push_str(", ");
                            v.push_str(value);
                        })
                        .or_insert_with(|| value.to_owned());
                }
            }

            match read_limited_bytes(response, self.max_body_size, url).await {
                Ok(content) => {
                    tracing::debug!(url = %url, status = status.as_u16(), bytes = content.len(), "Fetched");
                    return Ok(CrawlResponse {
                        url: final_url,
                        content,
                        headers: response_headers,
                        status_code: status.as_u16(),
                    });
                }
                Err(Error::IncompleteResponse { expected, received })
                    if retry_count < self.max_retries =>
                {
                    let delay = self.backoff(retry_count);
                    tracing::debug!(
                        url = %url,
                        expected = expected,
                        received = received,
                        attempt = retry_count + 1,
                        "Retrying incomplete download"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Reads the body with a size cap and a Content-Length completeness check.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
    url: &str,
) -> Result<Vec<u8>> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(Error::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::from_reqwest(url, e))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(Error::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(Error::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
