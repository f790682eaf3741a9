//! Transport used to reach the update endpoints

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default user agent for update requests
pub const DEFAULT_USER_AGENT: &str = concat!("patchup/", env!("CARGO_PKG_VERSION"));

/// Transport-level failures
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or its body could not be read
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    /// Any other fetcher-specific failure
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a fetcher-specific error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Fetch capability used by the updater
///
/// Implementations must bound every request in time; the updater itself
/// never applies a timeout. Dropping the returned future cancels the fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body behind `url`
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError>;
}

/// HTTP fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout and user agent
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    /// Create a fetcher with a custom timeout and user agent
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, TransportError> {
        debug!(url, "Fetching");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}
