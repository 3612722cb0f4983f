//! Error types of the grid search.

use thiserror::Error;

/// Errors that abort a grid search.
///
/// Every search is fail-stop: no partial or best-so-far transform is returned
/// when any of these occur.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Rejected before any work was dispatched.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scoring a candidate inside a chunk failed.
    #[error("Worker failure in chunk {chunk}: {reason}")]
    WorkerFailure {
        /// Index of the chunk whose evaluation failed.
        chunk: usize,
        /// What went wrong.
        reason: String,
    },

    /// The worker pool could not be created.
    #[error("Resource exhaustion: {0}")]
    ResourceExhaustion(String),
}

/// Result type of the grid search.
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a worker failure for the chunk at index `chunk`.
    pub fn worker_failure(chunk: usize, reason: impl Into<String>) -> Self {
        Self::WorkerFailure {
            chunk,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            SearchError::invalid_input("empty point set").to_string(),
            "Invalid input: empty point set"
        );
        assert_eq!(
            SearchError::worker_failure(3, "score is NaN").to_string(),
            "Worker failure in chunk 3: score is NaN"
        );
    }
}
