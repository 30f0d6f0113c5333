//! Press feed retrieval, parsing and caching.
//!
//! - [`parser`] turns RSS 2.0 bytes into [`PressItem`]s (pure, no I/O)
//! - [`fetcher`] retrieves the raw document through a [`FeedSource`]
//! - [`retry`] wraps a single fetch attempt in exponential backoff
//! - [`store`] owns the cached [`Snapshot`] and decides when to refresh
//!
//! # Example
//!
//! ```ignore
//! use koeln_presse::feed::{FeedStore, HttpFeedSource, StoreSettings};
//!
//! let source = HttpFeedSource::new(feed_url, Duration::from_secs(8))?;
//! let store = FeedStore::new(source, StoreSettings::default());
//! let snapshot = store.ensure_fresh().await?;
//! ```

mod error;
mod fetcher;
mod item;
mod parser;
mod retry;
mod store;

pub use error::{FetchError, ParseError, RefreshError, StoreError};
pub use fetcher::{FeedSource, HttpFeedSource, FEED_ACCEPT, USER_AGENT};
pub use item::{stable_id, PressItem, PLACEHOLDER_TITLE, SOURCE_TAG};
pub use parser::{parse_feed, parse_feed_at};
pub use retry::{retry, RetryPolicy};
pub use store::{FeedStore, Snapshot, StoreSettings, DEFAULT_BASE_URL};
