//! The query loop: one call per keystroke, one ranked list back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, trace};

use super::item::{Item, Snapshot};
use super::matcher::{Matcher, Query, ScoreWeights};
use super::ranker::{rank_keyed, DEFAULT_APPLICATION_BIAS};
use crate::executor::ExecutionAction;
use crate::services::item_cache::{
    ItemCache, ItemCacheBuilder, DEFAULT_CACHE_TIMEOUT, DEFAULT_STARTUP_TIMEOUT,
};
use crate::services::sources::Sources;

/// Tunables the session and its cache need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cache_timeout: Duration,
    pub max_results: usize,
    pub show_descriptions: bool,
    pub application_bias: u32,
    pub startup_timeout: Duration,
    pub weights: ScoreWeights,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            max_results: 50,
            show_descriptions: true,
            application_bias: DEFAULT_APPLICATION_BIAS,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            weights: ScoreWeights::default(),
        }
    }
}

impl Settings {
    /// A cache builder with this timeout configuration.
    pub fn cache_builder(&self, sources: Sources) -> ItemCacheBuilder {
        ItemCache::builder(sources)
            .timeout(self.cache_timeout)
            .startup_timeout(self.startup_timeout)
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.weights, self.show_descriptions)
    }
}

/// Ranked results for one query.
///
/// Holds the snapshot it was computed from, so the items stay valid even
/// after the cache swaps in a newer snapshot.
#[derive(Debug, Clone)]
pub struct SearchResults {
    generation: u64,
    query: String,
    snapshot: Option<Arc<Snapshot>>,
    indices: Vec<usize>,
}

impl SearchResults {
    fn empty(generation: u64, query: String) -> Self {
        Self {
            generation,
            query,
            snapshot: None,
            indices: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The query as typed.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Item> {
        let index = *self.indices.get(position)?;
        self.snapshot.as_ref()?.get(index)
    }

    pub fn first(&self) -> Option<&Item> {
        self.get(0)
    }

    /// Items best first.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.indices
            .iter()
            .filter_map(move |&index| self.snapshot.as_ref()?.get(index))
    }
}

/// Turns query strings into ranked item lists.
pub struct SearchSession {
    cache: ItemCache,
    matcher: Matcher,
    application_bias: u32,
    max_results: usize,
    generation: AtomicU64,
    error_reported: AtomicBool,
}

impl SearchSession {
    pub fn new(cache: ItemCache, settings: &Settings) -> Self {
        Self {
            cache,
            matcher: settings.matcher(),
            application_bias: settings.application_bias,
            max_results: settings.max_results,
            generation: AtomicU64::new(0),
            error_reported: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    /// Score every item against `raw` and return the best `max_results`.
    ///
    /// Never fails: when no items can be obtained the result is empty and the
    /// error is reported once until a later collection succeeds.
    pub fn query_changed(&self, raw: &str) -> SearchResults {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let query = Query::new(raw);

        let snapshot = match self.cache.get_snapshot() {
            Ok(snapshot) => {
                self.error_reported.store(false, Ordering::Relaxed);
                snapshot
            }
            Err(error) => {
                if !self.error_reported.swap(true, Ordering::Relaxed) {
                    self.cache.reporter().collection_failed(&error);
                }
                return SearchResults::empty(generation, query.raw().to_string());
            }
        };

        let matches = snapshot
            .items()
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                self.matcher
                    .score(&query, item)
                    .map(|found| (index, found))
            });
        let indices = rank_keyed(matches, self.application_bias, self.max_results);

        trace!(
            query = query.normalized(),
            generation,
            results = indices.len(),
            "query ranked"
        );

        SearchResults {
            generation,
            query: query.raw().to_string(),
            snapshot: Some(snapshot),
            indices,
        }
    }

    /// Whether `results` answer the most recent query.
    pub fn is_current(&self, results: &SearchResults) -> bool {
        results.generation == self.generation.load(Ordering::Acquire)
    }

    /// What to run for `item`; `None` when it has nothing to execute.
    pub fn launch(&self, item: &Item) -> Option<ExecutionAction> {
        let action = ExecutionAction::for_item(item)?;
        info!(item = %item.identifier, command = %action.display(), "launch requested");
        Some(action)
    }
}
