//! Error types for lease stores and the membership driver.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for lease store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for membership driver operations.
pub type MembershipResult<T> = Result<T, MembershipError>;

/// Errors reported by a [`LeaseStore`](crate::interface::store::LeaseStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lease store is unavailable: {0}")]
    Unavailable(String),

    #[error("lease store backend error: {0}")]
    Backend(String),
}

/// Errors surfaced to callers of the membership driver.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// `start` was called on a driver that is already running.
    #[error("membership driver is already started")]
    AlreadyStarted,

    /// A registration write failed.
    #[error("lease store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// A discovery scan failed partway; no partial result is returned.
    #[error("node discovery scan failed: {0}")]
    Scan(#[source] StoreError),

    #[error("invalid service name {0:?}: must be non-empty and must not contain ':'")]
    InvalidServiceName(String),

    #[error("invalid node name {0:?}: must be non-empty")]
    InvalidNodeName(String),

    #[error("invalid lease timeout {0:?}: must be between 2ms and one year")]
    InvalidTimeout(Duration),
}

impl MembershipError {
    /// True for every error caused by the backing store, scans included.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            MembershipError::StoreUnavailable(_) | MembershipError::Scan(_)
        )
    }
}
