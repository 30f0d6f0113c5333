//! Cached, queryable view of the Stadt Köln press release feed.
//!
//! The [`feed`] module fetches and parses the RSS document and keeps the
//! latest snapshot in memory, [`query`] answers lookups over it, and
//! [`api`] exposes those queries over HTTP.

pub mod api;
pub mod config;
pub mod feed;
pub mod query;
pub mod util;

pub use config::{Config, ConfigError};
pub use feed::{FeedSource, FeedStore, HttpFeedSource, PressItem, StoreError};
pub use query::QueryEngine;
