use std::collections::BTreeSet;

use crate::feed::PressItem;

const TITLE_WEIGHT: u32 = 3;
const CATEGORY_WEIGHT: u32 = 2;
const DESCRIPTION_WEIGHT: u32 = 1;

/// Relevance of `item` for an already lowercased, non-empty `needle`.
///
/// Case-insensitive substring containment: +3 for the title, +2 for every
/// matching category, +1 for the description.
pub fn score_item(item: &PressItem, needle: &str) -> u32 {
    let mut score = 0;

    if item.title.to_lowercase().contains(needle) {
        score += TITLE_WEIGHT;
    }

    let category_hits = item
        .categories
        .iter()
        .filter(|c| c.to_lowercase().contains(needle))
        .count() as u32;
    score += CATEGORY_WEIGHT * category_hits;

    if item
        .description
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains(needle))
    {
        score += DESCRIPTION_WEIGHT;
    }

    score
}

/// Items matching `query`, best first, at most `limit` of them.
///
/// A blank query skips scoring and returns the first `limit` items as they
/// are. Equal scores keep their relative order.
pub fn rank<'a>(items: &'a [PressItem], query: &str, limit: usize) -> Vec<&'a PressItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().take(limit).collect();
    }

    let mut scored: Vec<(u32, &PressItem)> = items
        .iter()
        .map(|item| (score_item(item, &needle), item))
        .filter(|(score, _)| *score > 0)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, item)| item).collect()
}

/// The `n` most recently published items. Ties keep their relative order.
pub fn newest_first(items: &[PressItem], n: usize) -> Vec<&PressItem> {
    let mut sorted: Vec<&PressItem> = items.iter().collect();
    sorted.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    sorted.truncate(n);
    sorted
}

/// Sorted, deduplicated union of all item categories.
pub fn collect_categories<'a>(items: impl IntoIterator<Item = &'a PressItem>) -> Vec<String> {
    items
        .into_iter()
        .flat_map(|item| item.categories.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
