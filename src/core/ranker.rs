//! Orders matches for display.

use std::cmp::Ordering;

use super::item::{Category, Item};
use super::matcher::Match;

/// Default bonus for applications over bare commands.
pub const DEFAULT_APPLICATION_BIAS: u32 = 50;

/// Score after the category bias is applied.
pub fn combined_score(found: &Match<'_>, application_bias: u32) -> u32 {
    match found.item.category {
        Category::Application => found.score.saturating_add(application_bias),
        Category::Command => found.score,
    }
}

/// Sort matches best first and keep at most `limit`.
///
/// Ties on combined score fall back to display name (case-insensitive, then
/// exact), then identifier, so the output is fully deterministic.
pub fn rank<'a>(matches: Vec<Match<'a>>, application_bias: u32, limit: usize) -> Vec<&'a Item> {
    rank_keyed(
        matches.into_iter().map(|found| (found.item, found)),
        application_bias,
        limit,
    )
}

/// Like [`rank`], but returns the key attached to each match.
///
/// Lets callers rank positions in a snapshot instead of item references.
pub fn rank_keyed<'a, K>(
    matches: impl IntoIterator<Item = (K, Match<'a>)>,
    application_bias: u32,
    limit: usize,
) -> Vec<K> {
    let mut keyed: Vec<(u32, K, Match<'a>)> = matches
        .into_iter()
        .map(|(key, found)| (combined_score(&found, application_bias), key, found))
        .collect();

    keyed.sort_by(|(a_score, _, a), (b_score, _, b)| {
        b_score
            .cmp(a_score)
            .then_with(|| compare_names(a.item, b.item))
    });
    keyed.truncate(limit);

    keyed.into_iter().map(|(_, key, _)| key).collect()
}

fn compare_names(a: &Item, b: &Item) -> Ordering {
    a.normalized_name()
        .cmp(b.normalized_name())
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.identifier.cmp(&b.identifier))
}
