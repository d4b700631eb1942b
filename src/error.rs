//! Errors reported by the filters.

use thiserror::Error;

/// Result alias used by every fallible filter operation.
pub type Result<T> = std::result::Result<T, FilterError>;

/// The ways a filter operation can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// The eviction chain ran out of kicks before it found a free slot. The filter is left
    /// exactly as it was before the insertion. The only remedy is to rebuild it at a larger
    /// capacity.
    #[error("filter is full: eviction chain exhausted its kick budget")]
    Full,

    /// The item's fingerprint is in neither of its candidate buckets.
    #[error("item not found in filter")]
    NotFound,

    /// The construction parameters cannot produce a usable filter.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl FilterError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FilterError::InvalidParameters(msg.into())
    }
}
