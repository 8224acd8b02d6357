use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::store::{FileStore, KvStore};

/// Stored envelope: the cached value and when it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub value: T,
    #[serde(rename = "storedAt", with = "chrono::serde::ts_milliseconds")]
    pub stored_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(value: T, stored_at: DateTime<Utc>) -> Self {
        Self { value, stored_at }
    }

    /// An entry is fresh while `now - stored_at <= ttl`. Entries stamped in
    /// the future (clock skew) count as age zero.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.stored_at).to_std() {
            Ok(age) => age <= ttl,
            Err(_) => true,
        }
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.stored_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Read-through TTL cache over a `KvStore`.
///
/// Calls for the same key are serialized on a per-key async lock, so a second
/// caller arriving while the first is fetching waits and then reads the entry
/// the first one stored instead of fetching again.
///
/// Each key also carries a generation, bumped by `clear`. A fetch that was
/// already running when its key was cleared returns its value to its caller
/// but does not store it.
pub struct CacheManager {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    generations: Mutex<HashMap<String, u64>>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: Mutex::new(HashMap::new()),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// File-backed cache in `cache_dir`.
    pub fn open(cache_dir: PathBuf) -> Result<Self> {
        let store = FileStore::new(cache_dir.clone())
            .with_context(|| format!("Failed to open cache directory {}", cache_dir.display()))?;
        Ok(Self::new(Arc::new(store)))
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    fn generation(&self, key: &str) -> u64 {
        let generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        generations.get(key).copied().unwrap_or(0)
    }

    fn bump_generation(&self, key: &str) {
        let mut generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        let generation = generations.entry(key.to_string()).or_insert(0);
        *generation = generation.wrapping_add(1);
    }

    /// Load an entry. Unreadable or malformed records are purged and
    /// reported as absent.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let contents = match self.store.get(key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(cache = key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!(cache = key, error = %e, "Discarding corrupt cache entry");
                self.remove(key);
                None
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) {
        let cached = CachedData::new(value, self.clock.now());
        let contents = match serde_json::to_string(&cached) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(cache = key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &contents) {
            warn!(cache = key, error = %e, "Failed to write cache entry");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(cache = key, error = %e, "Failed to remove cache entry");
        }
    }

    /// Return the cached value for `key` if it is younger than `ttl`,
    /// otherwise run `fetcher`, store its value and return it.
    ///
    /// The fetcher's error is returned unchanged and nothing stale is
    /// substituted for it.
    pub async fn get<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        if let Some(cached) = self.load::<T>(key) {
            if cached.is_fresh(self.clock.now(), ttl) {
                debug!(cache = key, "Cache hit");
                return Ok(cached.value);
            }
            debug!(cache = key, stored_at = %cached.stored_at, "Cache entry expired");
            self.remove(key);
        } else {
            debug!(cache = key, "Cache miss");
        }

        let generation = self.generation(key);
        let value = fetcher().await?;
        if self.generation(key) == generation {
            self.save(key, &value);
        } else {
            debug!(cache = key, "Entry cleared during fetch, not storing");
        }
        Ok(value)
    }

    /// Drop the entry for `key`; the next `get` fetches, even if a fetch
    /// for `key` is in flight right now.
    pub fn clear(&self, key: &str) {
        debug!(cache = key, "Clearing cache entry");
        self.bump_generation(key);
        self.remove(key);
    }

    /// Human-readable age of the entry for `key`, if one is stored.
    pub fn age(&self, key: &str) -> Option<String> {
        self.load::<serde_json::Value>(key)
            .map(|cached| cached.age_display(self.clock.now()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::store::MemoryStore;
    use crate::models::{dedup_by_iso, Region};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 10, 12, 0, 0).unwrap()
    }

    fn manual_cache(store: Arc<MemoryStore>) -> (CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = CacheManager::with_clock(store, clock.clone());
        (cache, clock)
    }

    async fn counted_get(cache: &CacheManager, calls: &AtomicUsize, ttl: Duration) -> Vec<i64> {
        cache
            .get("numbers", ttl, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
                Ok::<_, String>(vec![n])
            })
            .await
            .expect("fetch should succeed")
    }

    #[test]
    fn test_cached_data_freshness_boundary() {
        let cached = CachedData::new(1, start());
        assert!(cached.is_fresh(start(), DAY));
        assert!(cached.is_fresh(start() + chrono::Duration::days(1), DAY));
        assert!(!cached.is_fresh(
            start() + chrono::Duration::days(1) + chrono::Duration::milliseconds(1),
            DAY
        ));
        // Clock skew: stored "in the future" still counts as fresh
        assert!(cached.is_fresh(start() - chrono::Duration::minutes(5), DAY));
    }

    #[test]
    fn test_cached_data_age_display() {
        let cached = CachedData::new(1, start());
        assert_eq!(cached.age_display(start()), "just now");
        assert_eq!(cached.age_display(start() + chrono::Duration::minutes(5)), "5m ago");
        assert_eq!(cached.age_display(start() + chrono::Duration::minutes(90)), "2h ago");
        assert_eq!(cached.age_display(start() + chrono::Duration::hours(30)), "1d ago");
        assert_eq!(cached.age_display(start() - chrono::Duration::minutes(3)), "just now");
    }

    #[test]
    fn test_envelope_format() {
        let cached = CachedData::new(vec!["a"], start());
        let json = serde_json::to_value(&cached).unwrap();
        assert_eq!(json["value"], serde_json::json!(["a"]));
        assert_eq!(json["storedAt"], serde_json::json!(start().timestamp_millis()));
    }

    #[tokio::test]
    async fn test_ttl_hit_within_window_and_single_refetch_after() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = manual_cache(store);
        let calls = AtomicUsize::new(0);

        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![0]);

        clock.advance(chrono::Duration::hours(12));
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![0]);

        clock.advance(chrono::Duration::hours(12));
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(chrono::Duration::milliseconds(1));
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![1]);
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_regions_scenario_dedup_then_cached() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = manual_cache(store);
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let raw = vec![
                Region::new("US", "United States"),
                Region::new("US", "United States (dup)"),
            ];
            Ok::<_, String>(dedup_by_iso(raw).regions)
        };

        let first = cache.get("regions", DAY, fetch).await.unwrap();
        assert_eq!(first, vec![Region::new("US", "United States")]);

        clock.advance(chrono::Duration::hours(1));
        let second = cache.get("regions", DAY, fetch).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_purged_and_refetched() {
        let store = Arc::new(MemoryStore::new());
        store.set("numbers", "{not json").unwrap();
        let (cache, _clock) = manual_cache(store.clone());
        let calls = AtomicUsize::new(0);

        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stored = store.get("numbers").unwrap().expect("entry should be rewritten");
        let parsed: CachedData<Vec<i64>> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed.value, vec![0]);
    }

    #[tokio::test]
    async fn test_wrong_shape_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store.set("numbers", r#"{"data":[5],"timestamp":1}"#).unwrap();
        let (cache, _clock) = manual_cache(store);
        let calls = AtomicUsize::new(0);

        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_value() {
        let store = Arc::new(MemoryStore::with_quota(4));
        let (cache, _clock) = manual_cache(store.clone());
        let calls = AtomicUsize::new(0);

        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![0]);
        assert!(!store.contains("numbers"));

        // Nothing was cached, so the next call fetches again
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_without_stale_fallback() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = manual_cache(store.clone());
        let calls = AtomicUsize::new(0);

        counted_get(&cache, &calls, DAY).await;
        clock.advance(chrono::Duration::days(2));

        let result: Result<Vec<i64>, String> = cache
            .get("numbers", DAY, || async { Err("network down".to_string()) })
            .await;
        assert_eq!(result, Err("network down".to_string()));
        assert!(!store.contains("numbers"), "expired entry should be purged");
    }

    #[tokio::test]
    async fn test_clear_forces_exactly_one_refetch() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _clock) = manual_cache(store);
        let calls = AtomicUsize::new(0);

        counted_get(&cache, &calls, DAY).await;
        cache.clear("numbers");
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![1]);
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Clearing a missing key is harmless
        cache.clear("never-stored");
    }

    #[tokio::test]
    async fn test_clear_during_fetch_is_not_undone() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _clock) = manual_cache(store.clone());
        let cache = Arc::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let first = tokio::spawn({
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .get("numbers", DAY, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = gate.await;
                        Ok::<_, String>(vec![0])
                    })
                    .await
            }
        });
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        cache.clear("numbers");
        let second = tokio::spawn({
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .get("numbers", DAY, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(vec![1])
                    })
                    .await
            }
        });
        release.send(()).unwrap();

        // The in-flight caller still gets its value
        assert_eq!(first.await.unwrap(), Ok(vec![0]));
        assert_eq!(second.await.unwrap(), Ok(vec![1]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stored = store.get("numbers").unwrap().expect("refetched entry stored");
        let parsed: CachedData<Vec<i64>> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed.value, vec![1]);
    }

    #[tokio::test]
    async fn test_concurrent_gets_fetch_once() {
        let store = Arc::new(MemoryStore::new());
        let (cache, _clock) = manual_cache(store);
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, String>(42)
        };

        let (a, b) = tokio::join!(
            cache.get("answer", DAY, fetch),
            cache.get("answer", DAY, fetch)
        );
        assert_eq!(a, Ok(42));
        assert_eq!(b, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_age_reports_stored_entry() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = manual_cache(store);
        let calls = AtomicUsize::new(0);

        assert_eq!(cache.age("numbers"), None);
        counted_get(&cache, &calls, DAY).await;
        clock.advance(chrono::Duration::minutes(7));
        assert_eq!(cache.age("numbers").as_deref(), Some("7m ago"));
    }

    #[tokio::test]
    async fn test_file_backed_cache_survives_reopen() {
        let temp = tempfile::TempDir::new().expect("Failed to create temp dir");
        let calls = AtomicUsize::new(0);

        {
            let cache = CacheManager::open(temp.path().to_path_buf()).unwrap();
            counted_get(&cache, &calls, DAY).await;
        }

        let cache = CacheManager::open(temp.path().to_path_buf()).unwrap();
        assert_eq!(counted_get(&cache, &calls, DAY).await, vec![0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
