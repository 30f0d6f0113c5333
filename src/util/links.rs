use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation and link resolution.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Validates a URL string for use as the upstream feed location.
///
/// Only `http` and `https` URLs with a host are accepted. Unlike a
/// user-supplied article link, the feed URL comes from operator
/// configuration, so local and private addresses are allowed (they are
/// what test servers and internal mirrors bind to).
///
/// # Examples
///
/// ```
/// use koeln_presse::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://example.com/feed.xml").is_ok());
/// assert!(validate_feed_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlValidationError::MissingHost(url_str.to_owned())),
    }

    Ok(url)
}

/// Resolves a feed-provided link against the site base URL.
///
/// - `/path` is appended to the base as-is
/// - anything not starting with `http` is joined to the base with a single `/`
/// - everything else is passed through unchanged
///
/// The result must parse as an absolute URL; the returned string is the
/// joined text itself, not the normalised [`Url`] serialisation, so an
/// already-absolute link comes back byte-for-byte.
///
/// # Examples
///
/// ```
/// use koeln_presse::util::resolve_link;
///
/// let base = "https://www.stadt-koeln.de";
/// assert_eq!(
///     resolve_link(base, "/pressemeldungen/123").unwrap(),
///     "https://www.stadt-koeln.de/pressemeldungen/123"
/// );
/// assert_eq!(
///     resolve_link(base, "pressemeldungen/124").unwrap(),
///     "https://www.stadt-koeln.de/pressemeldungen/124"
/// );
/// ```
pub fn resolve_link(base_url: &str, raw: &str) -> Result<String, UrlValidationError> {
    let raw = raw.trim();
    let base = base_url.trim_end_matches('/');

    let resolved = if raw.starts_with('/') {
        format!("{base}{raw}")
    } else if !raw.starts_with("http") {
        format!("{base}/{}", raw.trim_start_matches('/'))
    } else {
        raw.to_owned()
    };

    let parsed = Url::parse(&resolved)?;
    if !parsed.has_host() {
        return Err(UrlValidationError::MissingHost(resolved));
    }

    Ok(resolved)
}
