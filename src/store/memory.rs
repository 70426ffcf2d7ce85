use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt, TryStreamExt,
};
use tokio::{sync::RwLock, time::Instant};

use crate::{
    error::{StoreError, StoreResult},
    interface::store::LeaseStore,
};

pub const DEFAULT_SCAN_PAGE_SIZE: usize = 64;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

enum ScanCursor {
    Start,
    After(String),
    Done,
}

/// In-process [`LeaseStore`] with TTL expiry and paged prefix scans.
///
/// Expiry is measured on the tokio clock, so a paused runtime controls it.
/// The store can be switched unavailable to simulate an unreachable backend.
pub struct MemoryLeaseStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    available: AtomicBool,
    page_size: usize,
}

impl Default for MemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }

    /// Number of keys returned per scan page. Clamped to at least one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// While unavailable, every store operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Value of a live key. Ignores availability.
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Remaining time to live of a live key. Ignores availability.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at - now)
    }

    /// Count of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "memory lease store is switched off".to_string(),
            ))
        }
    }

    async fn scan_page(
        &self,
        prefix: &str,
        cursor: ScanCursor,
    ) -> StoreResult<(Vec<String>, ScanCursor)> {
        self.check_available()?;

        let lower = match &cursor {
            ScanCursor::Start => Bound::Included(prefix),
            ScanCursor::After(key) => Bound::Excluded(key.as_str()),
            ScanCursor::Done => return Ok((Vec::new(), ScanCursor::Done)),
        };

        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut page: Vec<String> = Vec::new();
        let mut next = ScanCursor::Done;
        for (key, entry) in entries
            .range::<str, _>((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            if page.len() == self.page_size {
                next = ScanCursor::After(page[page.len() - 1].clone());
                break;
            }
            if entry.is_live(now) {
                page.push(key.clone());
            }
        }

        Ok((page, next))
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.check_available()?;

        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            StoreError::Backend(format!("ttl {:?} for key {} is out of range", ttl, key))
        })?;
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> StoreResult<()> {
        self.check_available()?;

        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn scan<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StoreResult<String>> {
        stream::try_unfold(ScanCursor::Start, move |cursor| async move {
            if let ScanCursor::Done = cursor {
                return Ok::<_, StoreError>(None);
            }
            let (page, next) = self.scan_page(prefix, cursor).await?;
            Ok(Some((
                stream::iter(page.into_iter().map(Ok::<_, StoreError>)),
                next,
            )))
        })
        .try_flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scan_all(store: &MemoryLeaseStore, prefix: &str) -> StoreResult<Vec<String>> {
        store.scan(prefix).try_collect().await
    }

    #[tokio::test(start_paused = true)]
    async fn put_then_expire() {
        let store = MemoryLeaseStore::new();
        store
            .put("jobs:a", "jobs:a", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(store.get("jobs:a").await.as_deref(), Some("jobs:a"));
        assert_eq!(store.ttl("jobs:a").await, Some(Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.ttl("jobs:a").await, Some(Duration::from_secs(2)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.get("jobs:a").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn put_refreshes_ttl() {
        let store = MemoryLeaseStore::new();
        store.put("k", "v", Duration::from_secs(2)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.put("k", "v", Duration::from_secs(2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.ttl("k").await, Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn unrepresentable_ttl_is_an_error() {
        let store = MemoryLeaseStore::new();
        assert!(matches!(
            store.put("k", "v", Duration::MAX).await,
            Err(StoreError::Backend(_))
        ));
        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn delete_ignores_missing_keys() {
        let store = MemoryLeaseStore::new();
        store.put("k", "v", Duration::from_secs(2)).await.unwrap();

        store.delete(&["k", "missing"]).await.unwrap();
        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn scan_pages_through_matching_keys_only() {
        let store = MemoryLeaseStore::new().with_page_size(2);
        for key in &["svcA:1", "svcA:2", "svcA:3", "svcA:4", "svcA:5", "svcB:1", "svc:1"] {
            store.put(key, key, Duration::from_secs(10)).await.unwrap();
        }

        let keys = scan_all(&store, "svcA:").await.unwrap();
        assert_eq!(keys, vec!["svcA:1", "svcA:2", "svcA:3", "svcA:4", "svcA:5"]);

        let keys = scan_all(&store, "svcB:").await.unwrap();
        assert_eq!(keys, vec!["svcB:1"]);

        assert!(scan_all(&store, "svcC:").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn scan_skips_expired_keys() {
        let store = MemoryLeaseStore::new().with_page_size(1);
        store.put("jobs:a", "a", Duration::from_secs(1)).await.unwrap();
        store.put("jobs:b", "b", Duration::from_secs(10)).await.unwrap();
        store.put("jobs:c", "c", Duration::from_secs(1)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(scan_all(&store, "jobs:").await.unwrap(), vec!["jobs:b"]);
    }

    #[tokio::test]
    async fn unavailable_store_rejects_everything() {
        let store = MemoryLeaseStore::new();
        store.put("k", "v", Duration::from_secs(2)).await.unwrap();
        store.set_available(false);

        assert!(matches!(
            store.put("k", "v", Duration::from_secs(2)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.delete(&["k"]).await.is_err());
        assert!(scan_all(&store, "").await.is_err());

        store.set_available(true);
        assert_eq!(scan_all(&store, "").await.unwrap(), vec!["k"]);
    }
}
