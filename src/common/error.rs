//! Error types for the index.

use std::collections::TryReserveError;

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index.
///
/// A missing key is not an error: `delete` reports it through
/// [`DeleteOutcome::NotFound`](crate::DeleteOutcome::NotFound).
#[derive(Debug, Error)]
pub enum Error {
    /// Reserving memory for a node failed.
    ///
    /// Raised before any node of the tree is touched, so the index is left
    /// exactly as it was before the call.
    #[error("node allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// An invariant did not hold where it must.
    ///
    /// This indicates a bug in the rebalancing code, never a recoverable
    /// condition.
    #[error("corrupted tree: {0}")]
    CorruptedTree(String),

    /// The requested branching factor is too small to form a B-tree.
    #[error("invalid branching factor {order}: must be at least {min}")]
    InvalidOrder { order: usize, min: usize },
}

impl Error {
    /// Build a [`Error::CorruptedTree`] and log it.
    pub(crate) fn corrupted(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::error!(%reason, "tree invariant violated");
        Error::CorruptedTree(reason)
    }
}
