//! rufi - application launcher core.
//!
//! Discovers launchable items (XDG desktop entries and executables on
//! `$PATH`), keeps them in a time-based cache, and ranks them against a
//! partial query as the user types. Drawing windows and reading keys is left
//! to the frontend; the core takes query strings and hands back ordered lists.
//!
//! # Architecture
//!
//! - [`config`] - Configuration loading and management
//! - [`core`] - Item model, fuzzy matcher, ranker and search session
//! - [`services`] - Source readers, item cache and its on-disk copy
//! - [`executor`] - Turning a selected item into a runnable action
//!
//! # Example
//!
//! ```no_run
//! use rufi::{Config, SearchSession};
//!
//! let config = Config::load();
//! let settings = config.settings();
//! let cache = settings.cache_builder(config.sources()).build();
//! let session = SearchSession::new(cache, &settings);
//!
//! for item in session.query_changed("fire").iter() {
//!     println!("{}", item.display_name);
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod services;

pub use config::Config;
pub use core::item::{Category, ExecTarget, Item, Snapshot};
pub use core::session::{SearchResults, SearchSession, Settings};
pub use error::{CollectionError, ErrorReporter, LauncherError, LauncherResult, TracingReporter};
pub use executor::ExecutionAction;
pub use services::item_cache::ItemCache;
