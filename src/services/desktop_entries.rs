//! XDG desktop entry discovery.
//!
//! Scans the standard application directories for `.desktop` files and turns
//! each visible entry into an [`Item`] of category `Application`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use freedesktop_desktop_entry::DesktopEntry;
use tracing::{debug, trace};
use walkdir::WalkDir;

use super::sources::ItemSource;
use crate::core::item::{Category, ExecTarget, Item};
use crate::error::SourceError;

const SOURCE_NAME: &str = "desktop-entries";

/// Characters that make an `Exec=` line need a shell.
const SHELL_CHARS: &[char] = &['"', '\'', '\\', '$', '`', '|', '&', ';', '<', '>', '(', ')', '*'];

/// Reads application descriptors from a list of directories.
#[derive(Debug, Clone)]
pub struct DesktopEntryReader {
    dirs: Vec<PathBuf>,
}

impl DesktopEntryReader {
    /// Scan exactly these directories, in precedence order.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Standard XDG application directories plus `extra` ones.
    pub fn from_env(extra: &[PathBuf]) -> Self {
        let mut dirs = standard_dirs();
        for dir in extra {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Scan a directory for .desktop files and add new ids to `entries`.
    fn scan_directory(dir: &Path, seen: &mut HashSet<String>, entries: &mut Vec<Item>) {
        for entry in WalkDir::new(dir)
            .max_depth(2)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "desktop") {
                continue;
            }

            let Some(id) = desktop_file_id(dir, path) else {
                continue;
            };
            // An earlier directory already provided (or hid) this id
            if !seen.insert(id.clone()) {
                continue;
            }

            match Self::parse_desktop_file(path, id) {
                Some(item) => entries.push(item),
                None => trace!(path = %path.display(), "skipping desktop entry"),
            }
        }
    }

    /// Parse a .desktop file into an Item.
    fn parse_desktop_file(path: &Path, id: String) -> Option<Item> {
        let content = std::fs::read_to_string(path).ok()?;
        let entry = DesktopEntry::from_str(path, &content, Some(&["en"])).ok()?;

        // Skip entries that shouldn't be shown
        if entry.no_display() || entry.hidden() {
            return None;
        }

        // Use empty locale list to get default (untranslated) values
        let locales: &[&str] = &[];

        let name = entry.name(locales)?.to_string();
        if name.trim().is_empty() {
            return None;
        }
        let exec = parse_exec(entry.exec()?)?;

        let mut item = Item::new(id, name, exec, Category::Application);
        if let Some(comment) = entry.comment(locales) {
            if !comment.trim().is_empty() {
                item = item.with_description(comment.to_string());
            }
        }
        if let Some(icon) = entry.icon() {
            item = item.with_icon(icon);
        }
        Some(item)
    }
}

impl ItemSource for DesktopEntryReader {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn collect(&self) -> Result<Vec<Item>, SourceError> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for dir in &self.dirs {
            if dir.is_dir() {
                Self::scan_directory(dir, &mut seen, &mut entries);
            }
        }

        if entries.is_empty() {
            return Err(SourceError::Empty {
                reader: SOURCE_NAME.to_string(),
            });
        }

        // Sort by name for consistent ordering
        entries.sort_by(|a, b| {
            a.normalized_name()
                .cmp(b.normalized_name())
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        debug!(count = entries.len(), "indexed desktop applications");
        Ok(entries)
    }
}

/// Application directories in XDG precedence order (user first).
pub fn standard_dirs() -> Vec<PathBuf> {
    let mut dirs_to_scan: Vec<PathBuf> = Vec::new();

    // User local applications
    if let Some(data_home) = dirs::data_local_dir() {
        dirs_to_scan.push(data_home.join("applications"));
    }

    let data_dirs = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
    for dir in std::env::split_paths(&data_dirs) {
        if dir.is_absolute() {
            dirs_to_scan.push(dir.join("applications"));
        }
    }

    // Flatpak applications
    if let Some(home) = dirs::home_dir() {
        dirs_to_scan.push(home.join(".local/share/flatpak/exports/share/applications"));
    }
    dirs_to_scan.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));

    // Snap applications
    dirs_to_scan.push(PathBuf::from("/var/lib/snapd/desktop/applications"));

    let mut unique = Vec::with_capacity(dirs_to_scan.len());
    for dir in dirs_to_scan {
        if !unique.contains(&dir) {
            unique.push(dir);
        }
    }
    unique
}

/// Desktop file id: path below the scanned root with `/` replaced by `-`,
/// without the `.desktop` suffix.
fn desktop_file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("-");
    let id = joined.strip_suffix(".desktop")?;
    (!id.is_empty()).then(|| id.to_string())
}

/// Strip field codes from an exec command (%f, %u, %F, %U, etc.).
///
/// `%%` becomes a literal `%`; unknown codes are dropped.
pub fn strip_field_codes(exec: &str) -> String {
    let mut out = String::with_capacity(exec.len());
    let mut chars = exec.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(_) | None => {}
        }
    }

    out
}

/// Turn an `Exec=` value into something launchable.
///
/// Plain word lists become an argument vector; anything with quoting or shell
/// syntax is kept as a single command line for `sh -c`.
pub fn parse_exec(exec: &str) -> Option<ExecTarget> {
    let stripped = strip_field_codes(exec);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains(SHELL_CHARS) {
        let command = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        return Some(ExecTarget::Shell(command));
    }

    let argv: Vec<String> = trimmed.split_whitespace().map(str::to_string).collect();
    Some(ExecTarget::Argv(argv))
}
