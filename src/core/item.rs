//! Launchable items and the immutable snapshots that hold them.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Whether an item came from a desktop entry or a bare executable.
///
/// Only used to bias ranking, never to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Application,
    Command,
}

/// What to run when an item is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum ExecTarget {
    /// Program followed by its arguments
    Argv(Vec<String>),
    /// A command line that needs `sh -c` (quoting, pipes, variables)
    Shell(String),
}

impl ExecTarget {
    /// The program being invoked, without its directory.
    pub fn program_name(&self) -> Option<&str> {
        let program = match self {
            ExecTarget::Argv(argv) => argv.first().map(String::as_str),
            ExecTarget::Shell(command) => command.split_whitespace().next(),
        }?;

        Path::new(program)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
    }

    /// Render as a single command line (for display and logging).
    pub fn command_line(&self) -> String {
        match self {
            ExecTarget::Argv(argv) => argv.join(" "),
            ExecTarget::Shell(command) => command.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ExecTarget::Argv(argv) => argv.is_empty(),
            ExecTarget::Shell(command) => command.trim().is_empty(),
        }
    }
}

/// A launchable application or command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub identifier: String,
    pub display_name: String,
    pub description: Option<String>,
    pub exec_target: ExecTarget,
    pub category: Category,
    pub icon_hint: Option<String>,
    normalized_name: String,
    normalized_description: Option<String>,
    normalized_program: Option<String>,
}

impl Item {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        exec_target: ExecTarget,
        category: Category,
    ) -> Self {
        let display_name = display_name.into();
        let normalized_program = exec_target.program_name().map(normalize);
        Self {
            identifier: identifier.into(),
            normalized_name: normalize(&display_name),
            display_name,
            description: None,
            exec_target,
            category,
            icon_hint: None,
            normalized_description: None,
            normalized_program,
        }
    }

    /// An executable found on the search path; its name doubles as the command.
    pub fn command(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            name.clone(),
            name.clone(),
            ExecTarget::Argv(vec![name]),
            Category::Command,
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.normalized_description = Some(normalize(&description));
        self.description = Some(description);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon_hint = Some(icon.into());
        self
    }

    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }

    pub fn normalized_description(&self) -> Option<&str> {
        self.normalized_description.as_deref()
    }

    pub fn normalized_program(&self) -> Option<&str> {
        self.normalized_program.as_deref()
    }

    pub fn is_application(&self) -> bool {
        self.category == Category::Application
    }
}

/// Lower-case form used for every comparison in the matcher.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Concatenate reader outputs, keeping identifiers unique.
///
/// On collision an `Application` replaces a `Command` in place; otherwise the
/// first occurrence wins.
pub fn merge_items(batches: impl IntoIterator<Item = Vec<Item>>) -> Vec<Item> {
    let mut merged: Vec<Item> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in batches.into_iter().flatten() {
        match positions.get(&item.identifier) {
            Some(&index) => {
                if merged[index].category == Category::Command && item.is_application() {
                    merged[index] = item;
                }
            }
            None => {
                positions.insert(item.identifier.clone(), merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

/// An immutable, timestamped set of items.
#[derive(Debug)]
pub struct Snapshot {
    items: Vec<Item>,
    collected_at: SystemTime,
}

impl Snapshot {
    pub fn new(items: Vec<Item>, collected_at: SystemTime) -> Self {
        Self {
            items,
            collected_at,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn find(&self, identifier: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.identifier == identifier)
    }

    pub fn collected_at(&self) -> SystemTime {
        self.collected_at
    }

    /// Time elapsed since collection; zero if the clock went backwards.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.collected_at).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, name: &str) -> Item {
        Item::new(
            id,
            name,
            ExecTarget::Argv(vec![id.to_string()]),
            Category::Application,
        )
    }

    #[test]
    fn test_normalized_fields() {
        let item = app("org.gnome.Nautilus", "  Files ")
            .with_description("Access and organize FILES");
        assert_eq!(item.normalized_name(), "files");
        assert_eq!(
            item.normalized_description(),
            Some("access and organize files")
        );
        assert_eq!(item.display_name, "  Files ");
    }

    #[test]
    fn test_program_name_strips_directory() {
        let target = ExecTarget::Argv(vec!["/usr/bin/firefox".into(), "--new-window".into()]);
        assert_eq!(target.program_name(), Some("firefox"));

        let shell = ExecTarget::Shell("env GDK_BACKEND=x11 gimp".into());
        assert_eq!(shell.program_name(), Some("env"));

        assert_eq!(ExecTarget::Argv(vec![]).program_name(), None);
    }

    #[test]
    fn test_command_item() {
        let item = Item::command("htop");
        assert_eq!(item.identifier, "htop");
        assert_eq!(item.category, Category::Command);
        assert_eq!(item.exec_target, ExecTarget::Argv(vec!["htop".into()]));
        assert_eq!(item.normalized_program(), Some("htop"));
    }

    #[test]
    fn test_merge_prefers_application() {
        let merged = merge_items(vec![
            vec![Item::command("firefox"), Item::command("ls")],
            vec![app("firefox", "Firefox"), app("gimp", "GIMP")],
        ]);

        let ids: Vec<&str> = merged.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(ids, ["firefox", "ls", "gimp"]);
        assert_eq!(merged[0].category, Category::Application);
        assert_eq!(merged[0].display_name, "Firefox");
    }

    #[test]
    fn test_merge_keeps_first_of_same_category() {
        let merged = merge_items(vec![
            vec![app("editor", "First")],
            vec![app("editor", "Second"), Item::command("editor")],
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].display_name, "First");
    }

    #[test]
    fn test_snapshot_age_saturates() {
        let now = SystemTime::now();
        let snapshot = Snapshot::new(vec![], now + Duration::from_secs(10));
        assert_eq!(snapshot.age(now), Duration::ZERO);

        let snapshot = Snapshot::new(vec![], now - Duration::from_secs(301));
        assert_eq!(snapshot.age(now), Duration::from_secs(301));
    }
}
