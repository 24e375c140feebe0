//! Persistent verdict cache bounded by entry count and age.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{CacheEntry, Classification};
use crate::domain::errors::StorageError;
use crate::domain::ports::{ClockPort, KeyValueStorePort, SystemClock};

/// Namespace under which the whole cache is stored as one object.
pub const CACHE_NAMESPACE: &str = "quipCache";

/// Default maximum number of cached verdicts.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Default verdict lifetime in days.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Ordered so that eviction ties resolve by key.
type EntryMap = BTreeMap<String, CacheEntry>;

/// Capacity and lifetime limits of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum number of stored entries, at least 1.
    pub max_entries: usize,
    /// Entries older than this are never returned.
    pub ttl: chrono::Duration,
}

impl CachePolicy {
    /// Creates a policy; a zero capacity is raised to one.
    #[must_use]
    pub fn new(max_entries: usize, ttl: chrono::Duration) -> Self {
        Self {
            max_entries: max_entries.max(1),
            ttl,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, chrono::Duration::days(DEFAULT_TTL_DAYS))
    }
}

/// Key/value verdict cache persisted through a [`KeyValueStorePort`].
///
/// Reads are side-effect free: an expired entry reads as absent but stays in
/// the store until the next eviction or [`prune`](Self::prune). Every mutation
/// is a load-modify-store cycle against the shared store, so `put` and `prune`
/// are serialized behind one async lock and never overwrite each other.
pub struct ExpiringBoundedCache {
    store: Arc<dyn KeyValueStorePort>,
    clock: Arc<dyn ClockPort>,
    policy: CachePolicy,
    namespace: String,
    write_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ExpiringBoundedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringBoundedCache")
            .field("namespace", &self.namespace)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ExpiringBoundedCache {
    /// Creates a cache over `store` using the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStorePort>, policy: CachePolicy) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), policy)
    }

    /// Creates a cache with an explicit time source.
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn KeyValueStorePort>,
        clock: Arc<dyn ClockPort>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            namespace: CACHE_NAMESPACE.to_string(),
            write_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Looks up a fresh entry for `key`.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StorageError> {
        let mut entries = self.load().await?;
        let now = self.clock.now();

        match entries.remove(key) {
            Some(entry) if entry.is_fresh(now, self.policy.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Result cache hit");
                Ok(Some(entry))
            }
            Some(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, recorded_at = %entry.recorded_at, "Result cache entry expired");
                Ok(None)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Result cache miss");
                Ok(None)
            }
        }
    }

    /// Inserts or replaces the verdict for `key`, stamped with the current time.
    ///
    /// Inserting a new key into a full cache first evicts the entry with the
    /// oldest timestamp, expired or not.
    ///
    /// # Errors
    /// Returns error if the store cannot be read or written.
    pub async fn put(
        &self,
        key: &str,
        classification: Classification,
        confidence: f64,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;

        if !entries.contains_key(key) {
            while entries.len() >= self.policy.max_entries {
                let Some(oldest) = oldest_key(&entries) else {
                    break;
                };
                entries.remove(&oldest);
                debug!(key = %oldest, "Evicted oldest result cache entry");
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                classification,
                confidence: confidence.clamp(0.0, 1.0),
                recorded_at: self.clock.now(),
            },
        );

        self.save(&entries).await?;
        debug!(key = %key, classification = %classification, size = entries.len(), "Stored verdict");
        Ok(())
    }

    /// Rewrites the store to the freshest unexpired entries, newest first,
    /// truncated to capacity. Returns how many entries were dropped.
    ///
    /// # Errors
    /// Returns error if the store cannot be read or written.
    pub async fn prune(&self) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().await;
        let entries = self.load().await?;
        let before = entries.len();
        let now = self.clock.now();
        let ttl = self.policy.ttl;

        let mut fresh: Vec<(String, CacheEntry)> = entries
            .into_iter()
            .filter(|(_, entry)| entry.is_fresh(now, ttl))
            .collect();
        fresh.sort_by(|(ka, a), (kb, b)| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| ka.cmp(kb))
        });
        fresh.truncate(self.policy.max_entries);

        let kept: EntryMap = fresh.into_iter().collect();
        let removed = before - kept.len();
        self.save(&kept).await?;

        info!(removed = removed, remaining = kept.len(), "Pruned result cache");
        Ok(removed)
    }

    /// Returns the number of physically stored entries, expired ones included.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub async fn len(&self) -> Result<usize, StorageError> {
        Ok(self.load().await?.len())
    }

    /// Returns true if nothing is stored.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub async fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len().await? == 0)
    }

    /// Returns lookup statistics for this instance.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
        }
    }

    async fn load(&self) -> Result<EntryMap, StorageError> {
        let Some(value) = self.store.read(&self.namespace).await? else {
            return Ok(EntryMap::new());
        };

        let serde_json::Value::Object(raw) = value else {
            warn!(namespace = %self.namespace, "Stored result cache is not an object, ignoring it");
            return Ok(EntryMap::new());
        };

        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) => Some((key, entry)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping unreadable cache entry");
                    None
                }
            })
            .collect())
    }

    async fn save(&self, entries: &EntryMap) -> Result<(), StorageError> {
        let value = serde_json::to_value(entries)?;
        self.store.write(&self.namespace, value).await
    }
}

fn oldest_key(entries: &EntryMap) -> Option<String> {
    entries
        .iter()
        .min_by(|(ka, a), (kb, b)| a.recorded_at.cmp(&b.recorded_at).then_with(|| ka.cmp(kb)))
        .map(|(key, _)| key.clone())
}

/// Lookup statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of fresh hits.
    pub hits: u64,
    /// Number of misses, expired entries included.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Result cache: {:.1}% hit rate ({} hits, {} misses)",
            self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{ManualClock, MockStore};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn start_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn create_test_cache(policy: CachePolicy) -> (ExpiringBoundedCache, Arc<MockStore>, Arc<ManualClock>) {
        let store = Arc::new(MockStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let cache = ExpiringBoundedCache::with_clock(store.clone(), clock.clone(), policy);
        (cache, store, clock)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (cache, _store, _clock) = create_test_cache(CachePolicy::default());

        cache.put("imgA", Classification::Ai, 0.9).await.unwrap();
        let entry = cache.get("imgA").await.unwrap().unwrap();

        assert_eq!(entry.classification, Classification::Ai);
        assert!((entry.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(entry.recorded_at, start_time());
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _store, _clock) = create_test_cache(CachePolicy::default());

        assert!(cache.get("nonexistent").await.unwrap().is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent_without_prune() {
        let (cache, store, clock) = create_test_cache(CachePolicy::default());

        cache.put("imgA", Classification::Ai, 0.9).await.unwrap();
        clock.advance(chrono::Duration::days(DEFAULT_TTL_DAYS) + chrono::Duration::seconds(1));

        assert!(cache.get("imgA").await.unwrap().is_none());
        let raw = store.raw(CACHE_NAMESPACE).await.unwrap();
        assert!(raw.get("imgA").is_some(), "lookup must not mutate the store");
    }

    #[tokio::test]
    async fn test_entry_valid_at_exact_ttl() {
        let (cache, _store, clock) = create_test_cache(CachePolicy::default());

        cache.put("imgA", Classification::Real, 0.6).await.unwrap();
        clock.advance(chrono::Duration::days(DEFAULT_TTL_DAYS));

        assert!(cache.get("imgA").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_timestamp() {
        let (cache, _store, clock) = create_test_cache(CachePolicy::default());

        cache.put("k", Classification::Ai, 0.8).await.unwrap();
        clock.advance(chrono::Duration::hours(1));
        cache.put("k", Classification::Real, 0.55).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 1);
        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.classification, Classification::Real);
        assert!((entry.confidence - 0.55).abs() < f64::EPSILON);
        assert_eq!(entry.recorded_at, start_time() + chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let policy = CachePolicy::new(3, chrono::Duration::days(7));
        let (cache, _store, clock) = create_test_cache(policy);

        for i in 0..10 {
            cache
                .put(&format!("img{i}"), Classification::Real, 0.5)
                .await
                .unwrap();
            clock.advance(chrono::Duration::seconds(1));
            assert!(cache.len().await.unwrap() <= 3);
        }
    }

    #[tokio::test]
    async fn test_full_cache_evicts_oldest() {
        let (cache, _store, clock) = create_test_cache(CachePolicy::default());

        cache.put("old", Classification::Ai, 0.9).await.unwrap();
        for i in 1..DEFAULT_MAX_ENTRIES {
            clock.advance(chrono::Duration::seconds(1));
            cache
                .put(&format!("img{i:03}"), Classification::Real, 0.6)
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await.unwrap(), DEFAULT_MAX_ENTRIES);

        clock.advance(chrono::Duration::seconds(1));
        cache.put("new", Classification::Real, 0.7).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), DEFAULT_MAX_ENTRIES);
        assert!(cache.get("old").await.unwrap().is_none());
        assert!(cache.get("new").await.unwrap().is_some());
        assert!(cache.get("img001").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_eviction_tie_breaks_by_key() {
        let policy = CachePolicy::new(2, chrono::Duration::days(7));
        let (cache, _store, clock) = create_test_cache(policy);

        cache.put("b", Classification::Real, 0.5).await.unwrap();
        cache.put("a", Classification::Real, 0.5).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));
        cache.put("c", Classification::Real, 0.5).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_some());
        assert!(cache.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let policy = CachePolicy::new(2, chrono::Duration::days(7));
        let (cache, _store, clock) = create_test_cache(policy);

        cache.put("a", Classification::Real, 0.5).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));
        cache.put("b", Classification::Real, 0.5).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));
        cache.put("b", Classification::Ai, 0.8).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_some());
        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prune_drops_expired_and_keeps_newest() {
        let policy = CachePolicy::new(2, chrono::Duration::days(1));
        let (cache, store, clock) = create_test_cache(policy);

        cache.put("stale", Classification::Ai, 0.9).await.unwrap();
        clock.advance(chrono::Duration::days(2));
        cache.put("older", Classification::Real, 0.6).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));
        cache.put("newer", Classification::Real, 0.6).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 2);

        // Another session may leave the store over capacity.
        let mut raw = store.raw(CACHE_NAMESPACE).await.unwrap();
        raw["newest"] = serde_json::to_value(CacheEntry {
            key: "newest".to_string(),
            classification: Classification::Ai,
            confidence: 0.7,
            recorded_at: clock.now() + chrono::Duration::seconds(1),
        })
        .unwrap();
        store.write(CACHE_NAMESPACE, raw).await.unwrap();

        let removed = cache.prune().await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(cache.len().await.unwrap(), 2);
        assert!(cache.get("older").await.unwrap().is_none());
        assert!(cache.get("newer").await.unwrap().is_some());
        assert!(cache.get("newest").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_prune_removes_expired_entries() {
        let (cache, _store, clock) = create_test_cache(CachePolicy::default());

        cache.put("a", Classification::Ai, 0.9).await.unwrap();
        cache.put("b", Classification::Ai, 0.9).await.unwrap();
        clock.advance(chrono::Duration::days(8));
        cache.put("c", Classification::Real, 0.9).await.unwrap();

        assert_eq!(cache.prune().await.unwrap(), 2);
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_puts_do_not_lose_updates() {
        let store = Arc::new(MockStore::with_latency(Duration::from_millis(5)));
        let cache = Arc::new(ExpiringBoundedCache::new(store, CachePolicy::default()));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .put(&format!("img{i}"), Classification::Real, 0.5)
                        .await
                })
            })
            .collect();
        for task in futures_util::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }

        assert_eq!(cache.len().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let (cache, store, _clock) = create_test_cache(CachePolicy::default());

        store.set_fail_writes(true);
        let put = cache.put("k", Classification::Ai, 0.9).await;
        tokio_test::assert_err!(put);

        store.set_fail_writes(false);
        store.set_fail_reads(true);
        assert!(matches!(
            cache.get("k").await,
            Err(StorageError::ReadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_entries_are_skipped() {
        let (cache, store, _clock) = create_test_cache(CachePolicy::default());
        store
            .write(
                CACHE_NAMESPACE,
                serde_json::json!({
                    "bad": { "classification": "maybe" },
                    "good": {
                        "key": "good",
                        "classification": "ai",
                        "confidence": 0.8,
                        "recorded_at": start_time().to_rfc3339(),
                    }
                }),
            )
            .await
            .unwrap();

        assert_eq!(cache.len().await.unwrap(), 1);
        assert!(cache.get("good").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let (cache, _store, _clock) = create_test_cache(CachePolicy::default());
        cache.put("k", Classification::Ai, 0.9).await.unwrap();

        let _ = cache.get("k").await.unwrap();
        let _ = cache.get("missing").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
    }
}
