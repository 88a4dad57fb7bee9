//! Core engine module - platform-agnostic matching and ranking.
//!
//! Matching and ranking are pure functions over a snapshot. The session reads
//! snapshots through the services `ItemCache`, which owns all I/O.
//! - Item model and immutable snapshots
//! - Layered fuzzy matcher
//! - Ranker
//! - Search session (query in, ranked list out)

pub mod item;
pub mod matcher;
pub mod ranker;
pub mod session;

pub use item::{Category, ExecTarget, Item, Snapshot};
pub use matcher::{Match, MatchedField, Matcher, Query, ScoreWeights};
pub use session::{SearchResults, SearchSession, Settings};
