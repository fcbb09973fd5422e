//! Cache storage trait and in-memory implementation.
//!
//! Expiry is evaluated lazily: an entry past its retention window is dropped
//! when it is next looked up, and every store sweeps the whole table.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use super::traits::CachePolicy;

/// A cached entry handed out by storage.
#[derive(Debug, Clone)]
pub struct CachedEntry<V> {
  pub value: V,
  /// Wall-clock time of the fetch, for display
  pub cached_at: DateTime<Utc>,
  /// Monotonic time of the fetch, for freshness checks
  pub fetched_at: Instant,
  pub policy: CachePolicy,
}

impl<V> CachedEntry<V> {
  pub fn is_stale(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.fetched_at) >= self.policy.fresh_for
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync + 'static {
  type Value: Clone + Send + Sync + 'static;

  /// Look up an entry, dropping it if its retention window has passed.
  /// A hit counts as an access.
  fn get(&self, hash: &str, now: Instant) -> Option<CachedEntry<Self::Value>>;

  /// Insert or refresh an entry in place.
  fn store(&self, hash: &str, value: Self::Value, policy: CachePolicy, now: Instant);

  fn remove(&self, hash: &str);

  fn clear(&self);

  /// Drop every entry past its retention window, returning how many were dropped.
  fn evict_expired(&self, now: Instant) -> usize;

  fn len(&self) -> usize;
}

struct Slot<V> {
  entry: CachedEntry<V>,
  last_accessed: Instant,
}

impl<V> Slot<V> {
  fn is_expired(&self, now: Instant) -> bool {
    let last_touched = self.last_accessed.max(self.entry.fetched_at);
    now.saturating_duration_since(last_touched) >= self.entry.policy.retain_for
  }
}

/// In-memory storage keyed by query hash.
pub struct MemoryStorage<V> {
  entries: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> MemoryStorage<V> {
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
    }
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<String, Slot<V>>> {
    // Entries stay consistent even if a holder panicked mid-operation
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<V> Default for MemoryStorage<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V: Clone + Send + Sync + 'static> CacheStorage for MemoryStorage<V> {
  type Value = V;

  fn get(&self, hash: &str, now: Instant) -> Option<CachedEntry<V>> {
    let mut entries = self.entries();

    if entries.get(hash)?.is_expired(now) {
      entries.remove(hash);
      tracing::debug!(key = hash, "evicted expired cache entry");
      return None;
    }

    let slot = entries.get_mut(hash)?;
    slot.last_accessed = now;
    Some(slot.entry.clone())
  }

  fn store(&self, hash: &str, value: V, policy: CachePolicy, now: Instant) {
    let mut entries = self.entries();
    entries.retain(|_, slot| !slot.is_expired(now));
    entries.insert(
      hash.to_string(),
      Slot {
        entry: CachedEntry {
          value,
          cached_at: Utc::now(),
          fetched_at: now,
          policy,
        },
        last_accessed: now,
      },
    );
  }

  fn remove(&self, hash: &str) {
    self.entries().remove(hash);
  }

  fn clear(&self) {
    self.entries().clear();
  }

  fn evict_expired(&self, now: Instant) -> usize {
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|_, slot| !slot.is_expired(now));
    before - entries.len()
  }

  fn len(&self) -> usize {
    self.entries().len()
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage<V> {
  _value: PhantomData<fn() -> V>,
}

impl<V> NoopStorage<V> {
  pub fn new() -> Self {
    Self {
      _value: PhantomData,
    }
  }
}

impl<V> Default for NoopStorage<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V: Clone + Send + Sync + 'static> CacheStorage for NoopStorage<V> {
  type Value = V;

  fn get(&self, _hash: &str, _now: Instant) -> Option<CachedEntry<V>> {
    None // Always miss
  }

  fn store(&self, _hash: &str, _value: V, _policy: CachePolicy, _now: Instant) {
    // Discard
  }

  fn remove(&self, _hash: &str) {}

  fn clear(&self) {}

  fn evict_expired(&self, _now: Instant) -> usize {
    0
  }

  fn len(&self) -> usize {
    0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  const MIN: Duration = Duration::from_secs(60);

  fn policy() -> CachePolicy {
    CachePolicy::new(5 * MIN, 30 * MIN)
  }

  #[test]
  fn test_fresh_then_stale() {
    let storage = MemoryStorage::new();
    let t0 = Instant::now();
    storage.store("k", 1u32, policy(), t0);

    let entry = storage.get("k", t0 + 4 * MIN).unwrap();
    assert_eq!(entry.value, 1);
    assert!(!entry.is_stale(t0 + 4 * MIN));
    assert!(entry.is_stale(t0 + 6 * MIN));
  }

  #[test]
  fn test_evicted_after_retention_without_access() {
    let storage = MemoryStorage::new();
    let t0 = Instant::now();
    storage.store("k", 1u32, policy(), t0);

    assert!(storage.get("k", t0 + 31 * MIN).is_none());
    assert_eq!(storage.len(), 0);
  }

  #[test]
  fn test_access_extends_retention() {
    let storage = MemoryStorage::new();
    let t0 = Instant::now();
    storage.store("k", 1u32, policy(), t0);

    assert!(storage.get("k", t0 + 20 * MIN).is_some());
    // 31 minutes after the fetch, but only 11 after the last access
    assert!(storage.get("k", t0 + 31 * MIN).is_some());
    assert!(storage.get("k", t0 + 62 * MIN).is_none());
  }

  #[test]
  fn test_store_refreshes_in_place() {
    let storage = MemoryStorage::new();
    let t0 = Instant::now();
    storage.store("k", 1u32, policy(), t0);
    storage.store("k", 2u32, policy(), t0 + 6 * MIN);

    let entry = storage.get("k", t0 + 7 * MIN).unwrap();
    assert_eq!(entry.value, 2);
    assert!(!entry.is_stale(t0 + 7 * MIN));
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_store_sweeps_expired_entries() {
    let storage = MemoryStorage::new();
    let t0 = Instant::now();
    storage.store("old", 1u32, policy(), t0);
    storage.store("new", 2u32, policy(), t0 + 40 * MIN);

    assert_eq!(storage.len(), 1);
    assert!(storage.get("new", t0 + 40 * MIN).is_some());
  }

  #[test]
  fn test_evict_expired_counts() {
    let storage = MemoryStorage::new();
    let t0 = Instant::now();
    storage.store("a", 1u32, policy(), t0);
    storage.store("b", 2u32, CachePolicy::new(MIN, 2 * MIN), t0);

    assert_eq!(storage.evict_expired(t0 + 3 * MIN), 1);
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_noop_storage_never_hits() {
    let storage = NoopStorage::new();
    let t0 = Instant::now();
    storage.store("k", 1u32, policy(), t0);
    assert!(storage.get("k", t0).is_none());
    assert_eq!(storage.len(), 0);
  }
}
