use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use sha1::{Digest, Sha1};

/// Source tag stamped on every item of the Stadt Köln press feed.
pub const SOURCE_TAG: &str = "rss:stadt-koeln";

/// Title used when the feed entry has no (or only blank) `<title>`.
pub const PLACEHOLDER_TITLE: &str = "Unbekannter Titel";

/// A single press release parsed from the feed.
///
/// Items are immutable once built by the parser. `link` is always absolute
/// and `id` is unique within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PressItem {
    pub id: String,
    pub title: String,
    pub link: String,
    /// `content:encoded` when present, otherwise `<description>`.
    pub description: Option<String>,
    pub published_at: DateTime<FixedOffset>,
    /// Trimmed, non-empty, in feed order. Duplicates are kept.
    pub categories: Vec<String>,
    pub raw_guid: Option<String>,
    pub source: &'static str,
}

/// Derives the stable identifier of a press item.
///
/// A non-empty trimmed GUID is used verbatim. Otherwise the id is the
/// lowercase SHA-1 hex digest of `"{title}|{link}"` (both trimmed), so an
/// unchanged item without a GUID keeps its id across fetches.
pub fn stable_id(title: &str, link: &str, guid: Option<&str>) -> String {
    if let Some(guid) = guid {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!("{}|{}", title.trim(), link.trim());
    let hash = Sha1::digest(input.as_bytes());
    format!("{:x}", hash)
}
