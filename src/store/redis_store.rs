use std::{convert::TryFrom, time::Duration};

use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt, TryStreamExt,
};
use redis::{aio::MultiplexedConnection, Client, RedisError};

use crate::{
    error::{StoreError, StoreResult},
    interface::store::LeaseStore,
};

/// `COUNT` hint sent with every `SCAN` round-trip.
pub const DEFAULT_SCAN_COUNT: usize = 100;

/// [`LeaseStore`] backed by a Redis server.
///
/// Leases are plain string keys written with `SET key value PX ttl`, removed
/// with `DEL`, and discovered with `SCAN ... MATCH prefix*`. Redis performs
/// the expiry, so every instance pointed at the same server (or cluster
/// proxy) shares one keyspace.
#[derive(Clone)]
pub struct RedisLeaseStore {
    connection: MultiplexedConnection,
    scan_count: usize,
}

impl RedisLeaseStore {
    /// Opens a multiplexed connection to `url`, e.g. `redis://127.0.0.1:6379/0`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(store_error)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_error)?;
        Ok(Self::new(connection))
    }

    pub fn new(connection: MultiplexedConnection) -> Self {
        Self {
            connection,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Clamped to at least one.
    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count.max(1);
        self
    }
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let millis = ttl_millis(ttl)?;
        let mut connection = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut connection)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut command = redis::cmd("DEL");
        for key in keys {
            command.arg(*key);
        }
        let mut connection = self.connection.clone();
        let _: i64 = command
            .query_async(&mut connection)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    fn scan<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StoreResult<String>> {
        let pattern = match_pattern(prefix);
        // `None` once the server has returned cursor 0.
        stream::try_unfold(Some(0u64), move |cursor| {
            let pattern = pattern.clone();
            let mut connection = self.connection.clone();
            async move {
                let cursor = match cursor {
                    Some(cursor) => cursor,
                    None => return Ok::<_, StoreError>(None),
                };
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(self.scan_count)
                    .query_async(&mut connection)
                    .await
                    .map_err(store_error)?;
                let next = if next == 0 { None } else { Some(next) };
                Ok(Some((
                    stream::iter(keys.into_iter().map(Ok::<_, StoreError>)),
                    next,
                )))
            }
        })
        .try_flatten()
        .boxed()
    }
}

/// Redis rejects `PX 0`, and the value must fit in a signed 64-bit integer.
fn ttl_millis(ttl: Duration) -> StoreResult<u64> {
    match u64::try_from(ttl.as_millis()) {
        Ok(millis) if millis > 0 && millis <= i64::MAX as u64 => Ok(millis),
        _ => Err(StoreError::Backend(format!(
            "ttl {:?} cannot be expressed in whole milliseconds",
            ttl
        ))),
    }
}

/// Glob that matches keys starting with `prefix` literally.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

fn store_error(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}
