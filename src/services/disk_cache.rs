//! On-disk copy of the last collected snapshot.
//!
//! Lets a fresh launcher start without rescanning. The file is JSON and is
//! replaced atomically (write to a temp file, then rename), so a crash never
//! leaves a half-written cache behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::item::{Category, ExecTarget, Item, Snapshot};
use crate::error::{LauncherError, LauncherResult};

/// Bumped whenever the file layout changes; other versions are ignored.
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    version: u32,
    /// Unix timestamp (seconds) of the collection
    collected_at: u64,
    items: Vec<CachedItem>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedItem {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    exec: ExecTarget,
    category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
}

impl From<&Item> for CachedItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.identifier.clone(),
            name: item.display_name.clone(),
            description: item.description.clone(),
            exec: item.exec_target.clone(),
            category: item.category,
            icon: item.icon_hint.clone(),
        }
    }
}

impl From<CachedItem> for Item {
    fn from(cached: CachedItem) -> Self {
        let mut item = Item::new(cached.id, cached.name, cached.exec, cached.category);
        if let Some(description) = cached.description {
            item = item.with_description(description);
        }
        if let Some(icon) = cached.icon {
            item = item.with_icon(icon);
        }
        item
    }
}

/// Reads and writes the item cache file.
#[derive(Debug, Clone)]
pub struct DiskCache {
    path: PathBuf,
}

impl DiskCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CACHE_HOME/rufi/items.json`, if a cache dir is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("rufi").join("items.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored snapshot.
    ///
    /// Returns `Ok(None)` when there is no file, it was written by another
    /// format version, or its timestamp cannot be represented.
    pub fn load(&self) -> LauncherResult<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let file: CacheFile = serde_json::from_str(&contents)?;
        if file.version != FORMAT_VERSION {
            debug!(
                path = %self.path.display(),
                version = file.version,
                "ignoring item cache with unknown version"
            );
            return Ok(None);
        }

        let Some(collected_at) = UNIX_EPOCH.checked_add(Duration::from_secs(file.collected_at))
        else {
            debug!(
                path = %self.path.display(),
                collected_at = file.collected_at,
                "ignoring item cache with out-of-range timestamp"
            );
            return Ok(None);
        };
        let items: Vec<Item> = file.items.into_iter().map(Item::from).collect();
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(Snapshot::new(items, collected_at)))
    }

    /// Replace the stored snapshot.
    pub fn store(&self, snapshot: &Snapshot) -> LauncherResult<()> {
        let collected_at = snapshot
            .collected_at()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let file = CacheFile {
            version: FORMAT_VERSION,
            collected_at,
            items: snapshot.items().iter().map(CachedItem::from).collect(),
        };
        let json = serde_json::to_string(&file)?;

        let parent = self
            .path
            .parent()
            .ok_or_else(|| LauncherError::DiskCache("cache path has no parent".into()))?;
        fs::create_dir_all(parent)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), count = snapshot.len(), "stored item cache");
        Ok(())
    }
}

/// Seconds-resolution timestamp, as stored on disk.
pub fn truncate_to_secs(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    UNIX_EPOCH + Duration::from_secs(secs)
}
