//! Watch orchestration for reload notifications.
//!
//! This module owns the authoritative set of glob patterns (project
//! defaults plus per-ensemble patterns), binds the file watcher's
//! lifecycle to notification emission, and rewrites each surviving
//! add/change event into a logical path before publishing it.
//!
//! # Architecture
//!
//! ```text
//! WatchOrchestrator
//!   - Single notify::RecommendedWatcher over root + ensemble roots
//!   - PatternSet filter (defaults + watch-enabled ensembles)
//!   - Debouncer absorbing save bursts
//!         |
//!     AliasTable::rewrite
//!         |
//!     ReloadChannel (json-reload)
//! ```

mod debouncer;
mod error;
mod orchestrator;
mod patterns;

pub use debouncer::Debouncer;
pub use error::WatchError;
pub use orchestrator::{WatchOrchestrator, WatchOrchestratorBuilder};
pub use patterns::{PatternOrigin, PatternSet, WatchPattern, load_patterns_and_overrides};
