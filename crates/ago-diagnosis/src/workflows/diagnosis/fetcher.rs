//! Retrieval of the page under diagnosis.

use std::future::Future;

use tracing::debug;
use url::Url;

use crate::config::FetchConfig;

/// Page body returned by a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Source of page markup. Implementations must reject non-HTML and non-2xx responses.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("url is not valid: {0}")]
    Malformed(String),
    #[error("unsupported scheme `{0}` (only http and https are allowed)")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} did not return HTML (content type `{content_type}`)")]
    NotHtml { url: String, content_type: String },
    #[error("could not read the body of {url}: {reason}")]
    Body { url: String, reason: String },
    #[error("http client could not be created: {0}")]
    Client(String),
}

/// Parses and validates a diagnosis target.
pub fn parse_target(raw: &str) -> Result<Url, TargetError> {
    let url = Url::parse(raw.trim()).map_err(|err| TargetError::Malformed(format!("{raw}: {err}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TargetError::UnsupportedScheme(other.to_string())),
    }
}

/// `reqwest` backed fetcher sharing one pooled client.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let target = url.to_string();
        let classify = |err: reqwest::Error| {
            if err.is_timeout() {
                FetchError::Timeout {
                    url: target.clone(),
                }
            } else {
                FetchError::Request {
                    url: target.clone(),
                    reason: err.to_string(),
                }
            }
        };

        let response = self.client.get(url.clone()).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target,
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_html_content_type(&content_type) {
            return Err(FetchError::NotHtml {
                url: target,
                content_type,
            });
        }

        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                FetchError::Timeout {
                    url: target.clone(),
                }
            } else {
                FetchError::Body {
                    url: target.clone(),
                    reason: err.to_string(),
                }
            }
        })?;

        debug!(url = %target, status = status.as_u16(), bytes = body.len(), "fetched target page");

        Ok(FetchedPage {
            url: target,
            status: status.as_u16(),
            body,
        })
    }
}

/// Missing content types are accepted; servers frequently omit them for HTML.
fn is_html_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    essence.is_empty() || essence == "text/html" || essence == "application/xhtml+xml"
}
