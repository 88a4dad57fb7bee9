//! Item discovery and caching.
//!
//! Source readers scan the filesystem; the item cache owns the current
//! snapshot and refreshes it in the background.

pub mod desktop_entries;
pub mod disk_cache;
pub mod item_cache;
pub mod path_executables;
pub mod sources;

pub use desktop_entries::DesktopEntryReader;
pub use disk_cache::DiskCache;
pub use item_cache::{Clock, Freshness, ItemCache, SystemClock};
pub use path_executables::PathExecutableReader;
pub use sources::{ItemSource, Sources};
