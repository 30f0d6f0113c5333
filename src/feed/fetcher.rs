use futures::StreamExt;
use reqwest::header::ACCEPT;
use std::future::Future;
use std::time::Duration;

use super::error::FetchError;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Accept header preferring feed-flavoured XML.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml";

/// Descriptive client identifier sent with every feed request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Where a [`FeedStore`](super::FeedStore) gets its raw feed bytes from.
///
/// One call is one attempt; retrying is the store's job. Implementations
/// must bound their own running time.
pub trait FeedSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Fetches the feed document over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpFeedSource {
    /// Creates a source with its own client carrying [`USER_AGENT`].
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, url, timeout))
    }

    /// Creates a source that shares an existing client.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, FEED_ACCEPT)
            .send()
            .await?;

        // Validate HTTP status before reading the body
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %self.url, "Fetching press feed");

        // The timeout covers headers and body alike
        let bytes = tokio::time::timeout(self.timeout, self.fetch_once())
            .await
            .map_err(|_| FetchError::Timeout)??;

        tracing::debug!(url = %self.url, bytes = bytes.len(), "Fetched press feed");
        Ok(bytes)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // Fewer bytes than Content-Length means the connection dropped mid-body
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
