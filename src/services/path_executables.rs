//! Executables on the search path.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use super::sources::ItemSource;
use crate::core::item::Item;
use crate::error::SourceError;

const SOURCE_NAME: &str = "path-executables";

/// Lists executables in a set of directories, shell-lookup style.
#[derive(Debug, Clone)]
pub struct PathExecutableReader {
    dirs: Vec<PathBuf>,
}

impl PathExecutableReader {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Directories from `$PATH`, in order.
    pub fn from_env() -> Result<Self, SourceError> {
        let path = std::env::var_os("PATH").ok_or_else(|| SourceError::Unavailable {
            reader: SOURCE_NAME.to_string(),
            reason: "PATH is not set".to_string(),
        })?;
        Ok(Self::from_path_var(&path))
    }

    /// Directories from a `PATH`-style value; empty components are ignored.
    pub fn from_path_var(value: &OsStr) -> Self {
        let dirs = std::env::split_paths(value)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect();
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn scan_directory(dir: &Path, seen: &mut HashSet<String>, items: &mut Vec<Item>) {
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || !is_executable(path) {
                continue;
            }
            // First directory on the path wins, like the shell
            if seen.insert(name.to_string()) {
                items.push(Item::command(name));
            } else {
                trace!(path = %path.display(), "shadowed executable");
            }
        }
    }
}

impl ItemSource for PathExecutableReader {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn collect(&self) -> Result<Vec<Item>, SourceError> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();

        for dir in &self.dirs {
            if dir.is_dir() {
                Self::scan_directory(dir, &mut seen, &mut items);
            }
        }

        if items.is_empty() {
            return Err(SourceError::Empty {
                reader: SOURCE_NAME.to_string(),
            });
        }

        items.sort_unstable_by(|a, b| a.identifier.cmp(&b.identifier));
        debug!(count = items.len(), "indexed path executables");
        Ok(items)
    }
}

/// A regular file (after following links) with any execute bit set.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    let is_file = std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    is_file
        && path.extension().is_some_and(|ext| {
            ["exe", "bat", "cmd", "com"]
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
