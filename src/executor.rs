//! Result execution module - turns a selected item into something runnable.
//!
//! The core never spawns processes itself; the caller decides how (and
//! whether) to run the returned action.

use std::process::{Command, Stdio};

use crate::core::item::{ExecTarget, Item};

/// The action to perform when a result is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionAction {
    /// Run a program directly with its arguments
    Spawn { program: String, args: Vec<String> },

    /// Run a command line through `sh -c`
    RunShellCommand { command: String },
}

impl ExecutionAction {
    /// Build the action for an exec target.
    ///
    /// Returns `None` for an empty target.
    pub fn from_target(target: &ExecTarget) -> Option<Self> {
        match target {
            ExecTarget::Argv(argv) => {
                let (program, args) = argv.split_first()?;
                Some(ExecutionAction::Spawn {
                    program: program.clone(),
                    args: args.to_vec(),
                })
            }
            ExecTarget::Shell(command) if !command.trim().is_empty() => {
                Some(ExecutionAction::RunShellCommand {
                    command: command.clone(),
                })
            }
            ExecTarget::Shell(_) => None,
        }
    }

    /// The action for launching `item`.
    pub fn for_item(item: &Item) -> Option<Self> {
        Self::from_target(&item.exec_target)
    }

    /// A detached [`Command`] with null stdio, ready to spawn.
    pub fn to_command(&self) -> Command {
        let mut command = match self {
            ExecutionAction::Spawn { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            ExecutionAction::RunShellCommand { command } => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command);
                cmd
            }
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    /// Printable form, e.g. for `--exec`.
    pub fn display(&self) -> String {
        match self {
            ExecutionAction::Spawn { program, args } => {
                std::iter::once(program.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            ExecutionAction::RunShellCommand { command } => command.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::Category;

    #[test]
    fn test_argv_becomes_spawn() {
        let target = ExecTarget::Argv(vec!["code".into(), "--new-window".into()]);
        assert_eq!(
            ExecutionAction::from_target(&target),
            Some(ExecutionAction::Spawn {
                program: "code".into(),
                args: vec!["--new-window".into()],
            })
        );
    }

    #[test]
    fn test_shell_target() {
        let item = Item::new(
            "logs",
            "Logs",
            ExecTarget::Shell("journalctl -f | less".into()),
            Category::Application,
        );
        let action = ExecutionAction::for_item(&item).unwrap();

        assert_eq!(
            action,
            ExecutionAction::RunShellCommand {
                command: "journalctl -f | less".into()
            }
        );
        let command = action.to_command();
        assert_eq!(command.get_program(), "sh");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["-c", "journalctl -f | less"]);
    }

    #[test]
    fn test_empty_targets() {
        assert_eq!(ExecutionAction::from_target(&ExecTarget::Argv(vec![])), None);
        assert_eq!(
            ExecutionAction::from_target(&ExecTarget::Shell("  ".into())),
            None
        );
    }

    #[test]
    fn test_display() {
        let action = ExecutionAction::for_item(&Item::command("htop")).unwrap();
        assert_eq!(action.display(), "htop");
        assert_eq!(action.to_command().get_program(), "htop");
    }
}
