use thiserror::Error;

/// Errors raised while retrieving the raw feed document.
///
/// These cover the transport half of a refresh: network issues, HTTP
/// errors, timeouts and body size problems. Parsing failures live in
/// [`ParseError`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    /// Returns true if this error is transient and the request should be retried.
    ///
    /// Server errors (5xx) and rate limiting (429) are retried; any other
    /// status is treated as a permanent answer from the upstream.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout | FetchError::IncompleteResponse { .. } => {
                true
            }
            FetchError::HttpStatus(status) => *status >= 500 || *status == 429,
            FetchError::ResponseTooLarge => false,
        }
    }
}

/// Errors raised while turning feed bytes into press items.
///
/// None of these are retryable: the same bytes always produce the same error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("Invalid RSS XML: {0}")]
    Malformed(String),
    /// The root element has no `<channel>` child.
    #[error("RSS feed missing 'channel' element")]
    MissingChannel,
    /// No item survived per-item parsing.
    #[error("No valid press items found in RSS feed")]
    EmptyFeed,
}

/// Why a single refresh cycle (fetch with retries, then parse) failed.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Transport(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A concurrent refresh attempt this caller waited on failed.
    #[error("Concurrent refresh failed: {0}")]
    Shared(String),
    /// The background refresh task panicked or was aborted.
    #[error("Refresh task interrupted: {0}")]
    Interrupted(String),
}

/// Errors surfaced by [`FeedStore`](super::FeedStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Retries exhausted and no cached snapshot was available to fall back on.
    #[error("Failed to fetch press feed: {0}")]
    FetchFailed(#[source] RefreshError),
    /// A forced refresh failed. The previous snapshot, if any, is untouched.
    #[error("Failed to refresh cache: {0}")]
    RefreshFailed(#[source] RefreshError),
}
