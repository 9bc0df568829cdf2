//! Engine error types.
//!
//! Partial failures during the search are silent backtracking; only when the
//! whole search is exhausted does a single fatal [`ReconstructError`] reach
//! the caller, carrying the accumulated dead-end report.

use thiserror::Error;

use crate::reconstruct::report::DeadEndReport;

#[derive(Debug, Error)]
pub enum ReconstructError {
    /// The search exhausted every grammar alternative without consuming the
    /// whole model. This is a structural model/grammar mismatch, not a
    /// transient condition; the report names every position that failed.
    #[error("reconstruction failed: no grammar path consumes the model\n{report}")]
    Failure { report: DeadEndReport },

    /// A specific value or cross-reference could not be rendered.
    #[error("could not serialize {object_path}.{attribute}: {reason}")]
    Serialization {
        object_path: String,
        attribute: String,
        reason: String,
    },

    /// The search chain outgrew the configured bound; raised instead of
    /// exhausting the native call stack on deeply nested models.
    #[error("search depth limit of {limit} exceeded")]
    DepthExceeded { limit: usize },
}
