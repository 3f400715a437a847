//! Remote QR image source
//!
//! One call to [`QrSource::fetch`] is one download attempt. Retry policy
//! lives in the resolver so it can be exercised against a scripted source.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("gafetes/", env!("CARGO_PKG_VERSION"));

/// Why a single download attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyBody,
}

/// Source of QR image bytes for a URL
pub trait QrSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP source shared by every worker
#[derive(Debug, Clone)]
pub struct HttpQrSource {
    client: reqwest::blocking::Client,
}

impl HttpQrSource {
    /// Client with the per-attempt timeout applied to every request
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap a preconfigured client (proxy or TLS settings, tests)
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl QrSource for HttpQrSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url = %url, "Requesting QR image");

        let response = self.client.get(url).send().map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("image") {
            warn!(
                url = %url,
                content_type = %content_type,
                "Response is not declared as an image, accepting anyway"
            );
        }

        let bytes = response.bytes().map_err(classify)?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        Ok(bytes.to_vec())
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e.to_string())
    }
}
