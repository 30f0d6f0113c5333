//! Read-only queries over the cached press feed.
//!
//! Every [`QueryEngine`] operation first asks the [`FeedStore`] for a
//! fresh-or-stale snapshot, so any query may trigger a refresh. The
//! filtering, scoring and sorting itself is pure and lives in [`ranking`].

pub mod ranking;

use crate::feed::{FeedSource, FeedStore, PressItem, StoreError};

pub use ranking::{collect_categories, newest_first, rank, score_item};

/// Answers press item queries against a shared [`FeedStore`].
pub struct QueryEngine<S> {
    store: FeedStore<S>,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: FeedSource> QueryEngine<S> {
    pub fn new(store: FeedStore<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FeedStore<S> {
        &self.store
    }

    /// The `n` most recently published items, newest first.
    pub async fn latest(&self, n: usize) -> Result<Vec<PressItem>, StoreError> {
        let snapshot = self.store.ensure_fresh().await?;
        Ok(newest_first(snapshot.items(), n).into_iter().cloned().collect())
    }

    /// Looks an item up by id. A miss is `Ok(None)`, not an error.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<PressItem>, StoreError> {
        let snapshot = self.store.ensure_fresh().await?;
        Ok(snapshot.items().iter().find(|item| item.id == id).cloned())
    }

    /// Ranked substring search; see [`rank`].
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<PressItem>, StoreError> {
        let snapshot = self.store.ensure_fresh().await?;
        let hits: Vec<PressItem> = rank(snapshot.items(), query, limit)
            .into_iter()
            .cloned()
            .collect();

        tracing::debug!(query = %query, limit, hits = hits.len(), "Search completed");
        Ok(hits)
    }

    /// Every category in the current snapshot, sorted and deduplicated.
    pub async fn list_categories(&self) -> Result<Vec<String>, StoreError> {
        let snapshot = self.store.ensure_fresh().await?;
        Ok(collect_categories(snapshot.items()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FetchError, StoreSettings};
    use pretty_assertions::assert_eq;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Pressemeldungen</title>
  <item>
    <guid>a</guid>
    <title>Baustellen News</title>
    <link>/pressemeldungen/a</link>
    <pubDate>Mon, 01 Jan 2024 09:00:00 +0100</pubDate>
    <category>Verkehr</category>
  </item>
  <item>
    <guid>b</guid>
    <title>Sperrung am Ring</title>
    <link>/pressemeldungen/b</link>
    <pubDate>Wed, 03 Jan 2024 09:00:00 +0100</pubDate>
    <category>Baustellen</category>
    <category>Verkehr</category>
  </item>
  <item>
    <guid>c</guid>
    <title>Neues Museum</title>
    <link>https://museen.koeln/c</link>
    <description>Keine Baustellen mehr</description>
    <pubDate>Tue, 02 Jan 2024 09:00:00 +0100</pubDate>
    <category>Kultur</category>
  </item>
</channel></rss>"#;

    struct StaticSource(Result<&'static str, u16>);

    impl FeedSource for StaticSource {
        async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
            match self.0 {
                Ok(body) => Ok(body.as_bytes().to_vec()),
                Err(status) => Err(FetchError::HttpStatus(status)),
            }
        }
    }

    fn engine(source: StaticSource) -> QueryEngine<StaticSource> {
        QueryEngine::new(FeedStore::new(source, StoreSettings::default()))
    }

    fn ids(items: &[PressItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_latest_is_newest_first() {
        let engine = engine(StaticSource(Ok(FEED)));

        assert_eq!(ids(&engine.latest(10).await.unwrap()), vec!["b", "c", "a"]);
        assert_eq!(ids(&engine.latest(1).await.unwrap()), vec!["b"]);
        assert!(engine.latest(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id_hit_and_miss() {
        let engine = engine(StaticSource(Ok(FEED)));

        let item = engine.get_by_id("c").await.unwrap().unwrap();
        assert_eq!(item.title, "Neues Museum");
        assert_eq!(item.link, "https://museen.koeln/c");

        assert!(engine.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_ranks_and_resolves_links() {
        let engine = engine(StaticSource(Ok(FEED)));

        let hits = engine.search("BAUSTELLEN", 20).await.unwrap();
        assert_eq!(ids(&hits), vec!["a", "b", "c"]);
        assert_eq!(hits[0].link, "https://www.stadt-koeln.de/pressemeldungen/a");
    }

    #[tokio::test]
    async fn test_search_blank_query_keeps_feed_order() {
        let engine = engine(StaticSource(Ok(FEED)));
        assert_eq!(ids(&engine.search("", 2).await.unwrap()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_categories() {
        let engine = engine(StaticSource(Ok(FEED)));
        assert_eq!(
            engine.list_categories().await.unwrap(),
            vec!["Baustellen", "Kultur", "Verkehr"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_propagates() {
        let engine = engine(StaticSource(Err(502)));

        assert!(matches!(
            engine.latest(10).await,
            Err(StoreError::FetchFailed(_))
        ));
        assert!(matches!(
            engine.get_by_id("a").await,
            Err(StoreError::FetchFailed(_))
        ));
    }
}
