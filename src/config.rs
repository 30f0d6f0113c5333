//! Configuration file parser for ~/.config/koeln-presse/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos. Environment variables are applied on top of the
//! file (see [`Config::apply_env`]).
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{RetryPolicy, StoreSettings, DEFAULT_BASE_URL};
use crate::util::validate_feed_url;

/// Upstream feed of the Stadt Köln press office.
pub const DEFAULT_FEED_URL: &str =
    "https://www.stadt-koeln.de/externe-dienste/rss/pressemeldungen.xml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All structs use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub server: ServerConfig,
}

/// `[feed]`: where the feed lives and how it is fetched and cached.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    /// Base for resolving feed-relative item links.
    pub base_url: String,
    pub cache_ttl_secs: u64,
    /// Per-attempt budget for one HTTP fetch.
    pub http_timeout_secs: u64,
    /// Total fetch attempts per refresh, including the first.
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: 300,
            http_timeout_secs: 8,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            backoff_factor: 2.0,
        }
    }
}

/// `[server]`: listen address of the HTTP API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

const KNOWN_FEED_KEYS: &[&str] = &[
    "url",
    "base_url",
    "cache_ttl_secs",
    "http_timeout_secs",
    "max_attempts",
    "retry_base_delay_ms",
    "backoff_factor",
];
const KNOWN_SERVER_KEYS: &[&str] = &["host", "port"];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// `~/.config/koeln-presse/config.toml`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("koeln-presse")
                .join("config.toml")
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid loading a huge file
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feed_url = %config.feed.url, "Loaded configuration");
        Ok(config)
    }

    /// Overrides file values with environment variables.
    ///
    /// Recognised: `FEED_URL`, `CACHE_TTL`, `HTTP_TIMEOUT`, `HTTP_RETRIES`,
    /// `HOST`, `PORT`. `lookup` is `std::env::var(..).ok()` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FEED_URL") {
            self.feed.url = url;
        }
        if let Some(ttl) = parse_env(&lookup, "CACHE_TTL")? {
            self.feed.cache_ttl_secs = ttl;
        }
        if let Some(timeout) = parse_env(&lookup, "HTTP_TIMEOUT")? {
            self.feed.http_timeout_secs = timeout;
        }
        if let Some(attempts) = parse_env(&lookup, "HTTP_RETRIES")? {
            self.feed.max_attempts = attempts;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env(&lookup, "PORT")? {
            self.server.port = port;
        }
        Ok(())
    }

    /// Checks values serde cannot: URL shape and retry bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_feed_url(&self.feed.url)
            .map_err(|e| ConfigError::Invalid(format!("feed.url: {e}")))?;
        validate_feed_url(&self.feed.base_url)
            .map_err(|e| ConfigError::Invalid(format!("feed.base_url: {e}")))?;

        if self.feed.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "feed.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.feed.backoff_factor.is_finite() || self.feed.backoff_factor < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "feed.backoff_factor must be a finite number >= 1.0, got {}",
                self.feed.backoff_factor
            )));
        }
        if self.feed.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "feed.http_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.feed.http_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.feed.max_attempts,
            base_delay: Duration::from_millis(self.feed.retry_base_delay_ms),
            backoff_factor: self.feed.backoff_factor,
        }
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            ttl: Duration::from_secs(self.feed.cache_ttl_secs),
            retry: self.retry_policy(),
            base_url: self.feed.base_url.clone(),
        }
    }

    /// Socket address for the HTTP server.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "server.host {:?} is not an IP address",
                    self.server.host
                ))
            })
    }
}

fn parse_env<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::InvalidEnv { key, value }),
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for (key, value) in raw {
        let known: &[&str] = match key.as_str() {
            "feed" => KNOWN_FEED_KEYS,
            "server" => KNOWN_SERVER_KEYS,
            _ => {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                continue;
            }
        };
        if let Some(section) = value.as_table() {
            for inner in section.keys() {
                if !known.contains(&inner.as_str()) {
                    tracing::warn!(key = %format!("{key}.{inner}"), "Unknown key in config file, ignoring");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
