//! Error types for the client reload pipeline.

use thiserror::Error;

/// Errors from manifest retrieval and traversal.
///
/// Fetch and parse failures are retryable - the fetch loop retries them
/// indefinitely with a fixed delay. A traversal failure is fatal for that
/// one reload attempt only and never corrupts barrier state.
#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Manifest fetch failed: {reason}")]
    Fetch { reason: String },

    #[error("Manifest is not valid JSON: {reason}")]
    Parse { reason: String },

    #[error("Segment '{segment}' not found while traversing '{path}'")]
    Traverse { segment: String, path: String },
}
