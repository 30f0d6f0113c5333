use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::error::{FetchError, RefreshError, StoreError};
use super::fetcher::FeedSource;
use super::item::PressItem;
use super::parser::parse_feed;
use super::retry::{retry, RetryPolicy};

/// Base URL that feed-relative item links are resolved against.
pub const DEFAULT_BASE_URL: &str = "https://www.stadt-koeln.de";

/// An immutable, fully parsed view of the feed.
///
/// Snapshots are only ever published whole; readers hold an `Arc` and keep
/// seeing the same items even if a newer snapshot is installed meanwhile.
#[derive(Debug)]
pub struct Snapshot {
    items: Vec<PressItem>,
    captured_at: DateTime<Utc>,
    loaded_at: Instant,
}

impl Snapshot {
    pub fn items(&self) -> &[PressItem] {
        &self.items
    }

    /// Wall-clock time the snapshot was installed.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Time since the snapshot was installed (monotonic).
    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Tuning for a [`FeedStore`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Maximum snapshot age before a refresh is attempted.
    pub ttl: Duration,
    pub retry: RetryPolicy,
    /// Base URL for resolving relative item links.
    pub base_url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            retry: RetryPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Result of the last finished refresh attempt, as seen by callers that
/// queued behind it. Failures keep only their message.
type Outcome = Result<Arc<Snapshot>, String>;

struct Shared<S> {
    source: S,
    settings: StoreSettings,
    current: RwLock<Option<Arc<Snapshot>>>,
    /// Held for the whole fetch-parse-install cycle: one refresh in flight.
    refresh_gate: Mutex<Option<Outcome>>,
    /// Finished refresh attempts. Bumped under `refresh_gate`.
    attempts: AtomicU64,
}

/// Owns the cached feed snapshot and decides when to refresh it.
///
/// Cloning is cheap and every clone shares the same cache. Refreshes run
/// on a spawned task: a caller that stops waiting (timeout, dropped
/// request) does not abort the refresh, which still installs its result.
///
/// # Refresh policy
///
/// - [`ensure_fresh`](Self::ensure_fresh) serves the cached snapshot while
///   it is younger than the TTL, otherwise refreshes; on failure it falls
///   back to the stale snapshot if there is one
/// - [`force_refresh`](Self::force_refresh) always refreshes and never
///   falls back
/// - Readers of the current snapshot are never blocked by network I/O;
///   the write lock is only taken for the pointer swap
pub struct FeedStore<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for FeedStore<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: FeedSource> FeedStore<S> {
    pub fn new(source: S, settings: StoreSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                settings,
                current: RwLock::new(None),
                refresh_gate: Mutex::new(None),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.shared.settings
    }

    /// The installed snapshot, fresh or not, without triggering a refresh.
    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.shared.current.read().await.clone()
    }

    /// Returns a snapshot no older than the TTL, refreshing if needed.
    ///
    /// Concurrent callers that find the snapshot stale share one refresh
    /// attempt and its outcome, whether it succeeds or fails.
    ///
    /// # Errors
    ///
    /// [`StoreError::FetchFailed`] when the refresh fails and there is no
    /// previous snapshot to serve instead.
    pub async fn ensure_fresh(&self) -> Result<Arc<Snapshot>, StoreError> {
        if let Some(snapshot) = self.shared.fresh().await {
            tracing::debug!(
                items = snapshot.len(),
                age_secs = snapshot.age().as_secs(),
                "Serving cached press feed snapshot"
            );
            return Ok(snapshot);
        }

        let seen = self.shared.attempts.load(Ordering::Acquire);
        let shared = Arc::clone(&self.shared);
        let outcome = tokio::spawn(async move { shared.refresh_if_stale(seen).await })
            .await
            .unwrap_or_else(|e| Err(RefreshError::Interrupted(e.to_string())));

        match outcome {
            Ok(snapshot) => Ok(snapshot),
            Err(cause) => match self.current().await {
                Some(stale) => {
                    tracing::warn!(
                        error = %cause,
                        age_secs = stale.age().as_secs(),
                        captured_at = %stale.captured_at(),
                        "Feed refresh failed, serving stale snapshot"
                    );
                    Ok(stale)
                }
                None => {
                    tracing::error!(error = %cause, "Feed refresh failed and no cached snapshot exists");
                    Err(StoreError::FetchFailed(cause))
                }
            },
        }
    }

    /// Runs one refresh cycle regardless of snapshot age.
    ///
    /// # Errors
    ///
    /// [`StoreError::RefreshFailed`] wrapping the cause. The previous
    /// snapshot stays installed; whether to keep using it is up to the caller.
    pub async fn force_refresh(&self) -> Result<(), StoreError> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut last = shared.refresh_gate.lock().await;
            shared.refresh_recorded(&mut last).await
        })
        .await
        .unwrap_or_else(|e| Err(RefreshError::Interrupted(e.to_string())))
        .map(|_| ())
        .map_err(|cause| {
            tracing::warn!(error = %cause, "Forced feed refresh failed");
            StoreError::RefreshFailed(cause)
        })
    }

    /// Discards the snapshot; the next [`ensure_fresh`](Self::ensure_fresh) refetches.
    pub async fn clear(&self) {
        *self.shared.current.write().await = None;
        tracing::info!("Press feed cache cleared");
    }
}

impl<S: FeedSource> Shared<S> {
    async fn fresh(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|s| s.is_fresh(self.settings.ttl))
            .cloned()
    }

    /// `seen` is the attempt count observed before queueing for the gate.
    async fn refresh_if_stale(&self, seen: u64) -> Result<Arc<Snapshot>, RefreshError> {
        let mut last = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited for the gate
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        // An attempt finished while we waited: take its outcome instead of
        // running another full retry cycle
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(outcome) = last.as_ref() {
                tracing::debug!("Sharing outcome of the refresh that just finished");
                return outcome.clone().map_err(RefreshError::Shared);
            }
        }

        self.refresh_recorded(&mut last).await
    }

    /// Runs [`refresh`](Self::refresh) and publishes its outcome to callers
    /// queued on the gate. `last` is the locked gate.
    async fn refresh_recorded(
        &self,
        last: &mut Option<Outcome>,
    ) -> Result<Arc<Snapshot>, RefreshError> {
        let result = self.refresh().await;
        *last = Some(match &result {
            Ok(snapshot) => Ok(Arc::clone(snapshot)),
            Err(cause) => Err(cause.to_string()),
        });
        self.attempts.fetch_add(1, Ordering::Release);
        result
    }

    /// Fetch with retries, parse, then swap the new snapshot in.
    /// Callers must hold `refresh_gate`.
    async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let bytes = retry(&self.settings.retry, FetchError::is_retryable, || {
            self.source.fetch()
        })
        .await?;

        let items = parse_feed(&bytes, &self.settings.base_url)?;

        let snapshot = Arc::new(Snapshot {
            items,
            captured_at: Utc::now(),
            loaded_at: Instant::now(),
        });
        *self.current.write().await = Some(Arc::clone(&snapshot));

        tracing::info!(
            items = snapshot.len(),
            captured_at = %snapshot.captured_at(),
            "Installed new press feed snapshot"
        );
        Ok(snapshot)
    }
}
