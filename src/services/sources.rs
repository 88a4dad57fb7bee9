//! Item sources and the merge of their outputs.

use std::sync::Arc;

use tracing::{debug, info};

use crate::core::item::{merge_items, Item};
use crate::error::{CollectionError, ErrorReporter, PartialSourceFailure, SourceError};

/// Something that can list launchable items.
///
/// `collect` must be idempotent and only read the filesystem. Returning an
/// error means the source produced nothing at all; individual bad entries are
/// skipped silently.
pub trait ItemSource: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    fn collect(&self) -> Result<Vec<Item>, SourceError>;
}

/// The configured readers, composed into one logical producer.
#[derive(Clone)]
pub struct Sources {
    readers: Vec<Arc<dyn ItemSource>>,
}

impl Sources {
    pub fn new(readers: Vec<Arc<dyn ItemSource>>) -> Self {
        Self { readers }
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Run every reader and merge the results.
    ///
    /// Failed readers are reported as partial failures as long as at least
    /// one other reader produced items.
    pub fn collect(&self, reporter: &dyn ErrorReporter) -> Result<Vec<Item>, CollectionError> {
        let mut batches = Vec::with_capacity(self.readers.len());
        let mut failures = Vec::new();

        for reader in &self.readers {
            match reader.collect() {
                Ok(items) if items.is_empty() => failures.push(SourceError::Empty {
                    reader: reader.name().to_string(),
                }),
                Ok(items) => {
                    debug!(source = reader.name(), count = items.len(), "source collected");
                    batches.push(items);
                }
                Err(error) => failures.push(error),
            }
        }

        if batches.is_empty() {
            return Err(CollectionError::NoItems { failures });
        }

        for error in failures {
            reporter.partial_source_failure(&PartialSourceFailure { error });
        }

        let merged = merge_items(batches);
        info!(count = merged.len(), "collected launchable items");
        Ok(merged)
    }
}
