use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreResult;

/// A shared key-value store with per-key expiry.
///
/// Every instance of a service must talk to the same logical keyspace.
/// Implementations are used concurrently by the driver and its heartbeat
/// task, so they must be safe to share.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Upserts `key` with `value`, expiring after `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Removes `keys`. Keys that are absent or already expired are not an error.
    async fn delete(&self, keys: &[&str]) -> StoreResult<()>;

    /// Streams every live key starting with `prefix`.
    ///
    /// A failure partway through must be yielded as an `Err` item rather than
    /// ending the stream early.
    fn scan<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StoreResult<String>>;
}
