//! Error types for rufi
//!
//! Collection problems are never fatal: they are reported through an
//! [`ErrorReporter`] and the launcher keeps serving whatever it has.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

/// A single source reader could not produce any items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The reader scanned its directories but found nothing usable
    #[error("{reader} produced no items")]
    Empty { reader: String },

    /// The reader could not start scanning at all (e.g. `$PATH` unset)
    #[error("{reader} unavailable: {reason}")]
    Unavailable { reader: String, reason: String },
}

/// No items could be obtained from any source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Every reader failed, or the merged corpus was empty
    #[error("no launchable items found ({})", describe_failures(.failures))]
    NoItems { failures: Vec<SourceError> },

    /// The first, synchronous collection did not finish in time
    #[error("initial item collection timed out after {0:?}")]
    Timeout(Duration),

    /// The collection worker could not be started
    #[error("collection worker unavailable: {0}")]
    WorkerUnavailable(String),
}

fn describe_failures(failures: &[SourceError]) -> String {
    if failures.is_empty() {
        return "all sources empty".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One reader failed while another succeeded; the merge went ahead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("partial source failure: {error}")]
pub struct PartialSourceFailure {
    pub error: SourceError,
}

/// A background refresh failed and the previous snapshot was kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache refresh failed, keeping snapshot aged {stale_age:?}: {error}")]
pub struct RefreshFailure {
    pub error: CollectionError,
    pub stale_age: Duration,
}

/// Errors from the ambient layers (config, disk cache, binary).
#[derive(Debug, Error)]
pub enum LauncherError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Item collection errors surfaced to a caller
    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    /// On-disk item cache errors
    #[error("Item cache error: {0}")]
    DiskCache(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON errors from the on-disk item cache
    #[error("Item cache format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for rufi operations
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Receives non-fatal failures from collection and refresh.
///
/// Implementations must not panic; the core never terminates on these.
pub trait ErrorReporter: Send + Sync {
    fn collection_failed(&self, error: &CollectionError);
    fn partial_source_failure(&self, failure: &PartialSourceFailure);
    fn refresh_failed(&self, failure: &RefreshFailure);
}

/// Reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn collection_failed(&self, error: &CollectionError) {
        error!(%error, "item collection failed");
    }

    fn partial_source_failure(&self, failure: &PartialSourceFailure) {
        warn!(error = %failure.error, "item source failed, continuing with the others");
    }

    fn refresh_failed(&self, failure: &RefreshFailure) {
        warn!(
            error = %failure.error,
            stale_secs = failure.stale_age.as_secs(),
            "background refresh failed, serving stale items"
        );
    }
}
