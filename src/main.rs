//! rufi command-line frontend.
//!
//! Prints ranked matches for a query, or acts as a dmenu-style filter that
//! reads one query per line from stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rufi::{Config, ExecutionAction, Item, SearchResults, SearchSession, TracingReporter};

#[derive(Parser)]
#[command(name = "rufi")]
#[command(about = "Fuzzy application launcher", long_about = None)]
struct Cli {
    /// Query to rank items against (reads queries from stdin if omitted)
    #[arg(short, long)]
    query: Option<String>,

    /// Maximum number of results (overrides the config file)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Config file to use instead of ~/.config/rufi/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Neither read nor write the on-disk item cache
    #[arg(long)]
    no_disk_cache: bool,

    /// Print the command line of the top result instead of the list
    #[arg(long, conflicts_with = "launch")]
    exec: bool,

    /// Launch the top result
    #[arg(long)]
    launch: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(limit) = cli.limit {
        config.search.max_results = limit;
        config.validate();
    }
    if cli.no_disk_cache {
        config.cache.disk_cache = false;
    }

    let settings = config.settings();
    let mut builder = settings
        .cache_builder(config.sources())
        .reporter(Arc::new(TracingReporter));
    if let Some(disk) = config.disk_cache() {
        builder = builder.disk_cache(disk);
    }
    let session = SearchSession::new(builder.build(), &settings);

    match &cli.query {
        Some(query) => {
            let results = session.query_changed(query);
            handle_results(&session, &results, &cli, settings.show_descriptions)?;
        }
        None => {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("Failed to read query from stdin")?;
                let results = session.query_changed(&line);
                handle_results(&session, &results, &cli, settings.show_descriptions)?;
            }
        }
    }

    // Let a refresh started by a stale cache finish writing the disk copy
    if session.cache().is_refreshing()
        && !session.cache().wait_for_refresh(Duration::from_secs(5))
    {
        tracing::debug!("exiting with a background refresh still running");
    }

    Ok(())
}

fn handle_results(
    session: &SearchSession,
    results: &SearchResults,
    cli: &Cli,
    show_descriptions: bool,
) -> anyhow::Result<()> {
    if !cli.exec && !cli.launch {
        let mut out = io::stdout().lock();
        for item in results.iter() {
            writeln!(out, "{}", format_result(item, show_descriptions))?;
        }
        return Ok(());
    }

    let Some(item) = results.first() else {
        bail!("No match for '{}'", results.query());
    };
    let Some(action) = session.launch(item) else {
        bail!("'{}' has nothing to execute", item.display_name);
    };

    if cli.exec {
        println!("{}", action.display());
        return Ok(());
    }

    spawn(&action).with_context(|| format!("Failed to launch {}", item.display_name))
}

fn spawn(action: &ExecutionAction) -> io::Result<()> {
    let child = action.to_command().spawn()?;
    tracing::info!(pid = child.id(), command = %action.display(), "launched");
    Ok(())
}

/// One output line: the name, then the description after a tab when enabled.
fn format_result(item: &Item, show_descriptions: bool) -> String {
    match &item.description {
        Some(description) if show_descriptions => {
            format!("{}\t{}", item.display_name, description)
        }
        _ => item.display_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rufi::{Category, ExecTarget};

    fn files() -> Item {
        Item::new(
            "org.gnome.Nautilus.desktop",
            "Files",
            ExecTarget::Argv(vec!["nautilus".into()]),
            Category::Application,
        )
        .with_description("Access and organize files")
    }

    #[test]
    fn test_format_result_with_descriptions() {
        assert_eq!(format_result(&files(), true), "Files\tAccess and organize files");
        assert_eq!(format_result(&Item::command("ls"), true), "ls");
    }

    #[test]
    fn test_format_result_hides_descriptions() {
        assert_eq!(format_result(&files(), false), "Files");
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["rufi", "-q", "fire", "--exec"]).unwrap();
        assert_eq!(cli.query.as_deref(), Some("fire"));
        assert!(cli.exec);
        assert!(Cli::try_parse_from(["rufi", "--exec", "--launch"]).is_err());
    }
}
