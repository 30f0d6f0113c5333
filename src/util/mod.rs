//! Utility functions for common operations.
//!
//! - **Feed URL validation**: only http(s) upstreams are accepted
//! - **Link resolution**: feed-relative item links become absolute URLs

mod links;

pub use links::{resolve_link, validate_feed_url, UrlValidationError};
