//! Error types for the watch orchestrator.
//!
//! Sparse on purpose: pattern-compile failures are warn-and-skip and a
//! single unwatchable root is warn-and-continue, so only a watcher that
//! cannot start at all surfaces as an error. It is fatal to the watch
//! feature only; the rest of the dev server keeps operating.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
