//! Error type for the named-store layer.

use thiserror::Error;

/// Errors surfaced by the named-store layer.
///
/// The index itself never fails: absent keys and empty result sets are
/// ordinary return values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FuzzyError {
    /// A store with this name already exists
    #[error("store already exists: {0}")]
    StoreExists(String),

    /// No store with this name
    #[error("store not found: {0}")]
    StoreNotFound(String),

    /// Exact lookup of an absent key
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A request parameter is out of range
    #[error("invalid {name} parameter: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, FuzzyError>;

impl FuzzyError {
    /// True if the error is caused by the request rather than by store state.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, FuzzyError::InvalidParameter { .. })
    }
}
