//! Cache layer that orchestrates caching logic with network fetching.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use super::storage::{CacheStorage, CachedEntry};
use super::traits::{CachePolicy, CacheResult, QueryKey};
use crate::dart::DartError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, DartError>>>;

/// A fetch currently running for one key.
struct InFlight<V> {
  generation: u64,
  future: SharedFetch<V>,
}

/// What a miss resolves to once the flight table is locked.
enum Pending<V> {
  /// A flight finished and stored between the first lookup and the lock
  Stored(CachedEntry<V>),
  Flight(SharedFetch<V>),
}

struct FlightTable<V> {
  in_flight: HashMap<String, InFlight<V>>,
  next_generation: u64,
}

struct Inner<S: CacheStorage> {
  storage: S,
  flights: Mutex<FlightTable<S::Value>>,
}

impl<S: CacheStorage> Inner<S> {
  fn flights(&self) -> MutexGuard<'_, FlightTable<S::Value>> {
    self.flights.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record the outcome of a fetch, unless it was superseded while running.
  fn complete(
    &self,
    hash: &str,
    generation: u64,
    policy: CachePolicy,
    result: &Result<S::Value, DartError>,
  ) {
    let mut flights = self.flights();

    let is_current = flights
      .in_flight
      .get(hash)
      .is_some_and(|flight| flight.generation == generation);
    if !is_current {
      tracing::debug!(key = hash, generation, "discarding superseded fetch result");
      return;
    }

    // Store before releasing the slot so no caller sees neither
    if let Ok(value) = result {
      self
        .storage
        .store(hash, value.clone(), policy, Instant::now());
    }
    flights.in_flight.remove(hash);
  }
}

/// Cache layer that manages caching logic and network fetching.
///
/// Each key moves through Empty, Fresh and Stale according to its
/// [`CachePolicy`]. Concurrent requests for a key share one in-flight fetch,
/// which runs on its own task so it completes even if every caller goes away.
pub struct CacheLayer<S: CacheStorage> {
  inner: Arc<Inner<S>>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      inner: Arc::new(Inner {
        storage,
        flights: Mutex::new(FlightTable {
          in_flight: HashMap::new(),
          next_generation: 0,
        }),
      }),
    }
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. Fresh entry: return it, no network call
  /// 2. Stale or missing: join the in-flight fetch for this key, or start one
  /// 3. Fetch failed with a stale entry on hand: return the stale data with the error attached
  /// 4. Fetch failed with nothing cached: return the error
  ///
  /// `fetcher` is only invoked when a new fetch has to be started.
  pub async fn fetch<K, F, Fut>(
    &self,
    key: &K,
    policy: CachePolicy,
    fetcher: F,
  ) -> Result<CacheResult<S::Value>, DartError>
  where
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S::Value, DartError>> + Send + 'static,
  {
    let hash = key.cache_hash();
    let now = Instant::now();

    let cached = self.inner.storage.get(&hash, now);
    if let Some(entry) = &cached {
      if !entry.is_stale(now) {
        tracing::debug!(query = %key.description(), "cache hit");
        return Ok(CacheResult::from_cache(
          entry.value.clone(),
          entry.cached_at,
          false,
        ));
      }
    }

    let flight = match self.join_or_start(&hash, key, policy, fetcher) {
      Pending::Stored(entry) => {
        tracing::debug!(query = %key.description(), "cache hit after lock");
        return Ok(CacheResult::from_cache(entry.value, entry.cached_at, false));
      }
      Pending::Flight(flight) => flight,
    };

    match flight.await {
      Ok(data) => Ok(CacheResult::from_network(data, chrono::Utc::now())),
      Err(err) => match cached {
        Some(entry) => {
          tracing::warn!(query = %key.description(), error = %err, "re-fetch failed, serving stale data");
          Ok(CacheResult::stale_with_error(
            entry.value,
            entry.cached_at,
            err,
          ))
        }
        None => Err(err),
      },
    }
  }

  fn join_or_start<K, F, Fut>(
    &self,
    hash: &str,
    key: &K,
    policy: CachePolicy,
    fetcher: F,
  ) -> Pending<S::Value>
  where
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S::Value, DartError>> + Send + 'static,
  {
    let mut flights = self.inner.flights();

    if let Some(flight) = flights.in_flight.get(hash) {
      tracing::debug!(query = %key.description(), "joining in-flight fetch");
      return Pending::Flight(flight.future.clone());
    }

    // A flight stores before it leaves the table, so a fresh entry seen
    // under the lock means it already landed
    let now = Instant::now();
    if let Some(entry) = self.inner.storage.get(hash, now) {
      if !entry.is_stale(now) {
        return Pending::Stored(entry);
      }
    }

    flights.next_generation += 1;
    let generation = flights.next_generation;
    tracing::debug!(query = %key.description(), generation, "starting fetch");

    let inner = Arc::clone(&self.inner);
    let task_hash = hash.to_string();
    let request = fetcher();
    let task = tokio::spawn(async move {
      let result = request.await;
      inner.complete(&task_hash, generation, policy, &result);
      result
    });

    let future = async move {
      task
        .await
        .unwrap_or_else(|e| Err(DartError::request_failed(format!("fetch task failed: {}", e))))
    }
    .boxed()
    .shared();

    flights.in_flight.insert(
      hash.to_string(),
      InFlight {
        generation,
        future: future.clone(),
      },
    );

    Pending::Flight(future)
  }

  /// Read a cached entry without fetching. Applies lazy eviction.
  pub fn peek<K: QueryKey>(&self, key: &K) -> Option<CacheResult<S::Value>> {
    let now = Instant::now();
    self
      .inner
      .storage
      .get(&key.cache_hash(), now)
      .map(|entry| {
        let stale = entry.is_stale(now);
        CacheResult::from_cache(entry.value, entry.cached_at, stale)
      })
  }

  /// Drop the entry for a key. A fetch still running for it will not be stored.
  pub fn invalidate<K: QueryKey>(&self, key: &K) {
    let hash = key.cache_hash();
    let mut flights = self.inner.flights();
    flights.in_flight.remove(&hash);
    self.inner.storage.remove(&hash);
    tracing::debug!(query = %key.description(), "invalidated");
  }

  /// Drop every entry and forget all in-flight fetches.
  pub fn clear(&self) {
    let mut flights = self.inner.flights();
    let abandoned = flights.in_flight.len();
    flights.in_flight.clear();

    let expired = self.inner.storage.evict_expired(Instant::now());
    let live = self.inner.storage.len();
    self.inner.storage.clear();
    tracing::debug!(live, expired, abandoned, "cache cleared");
  }

  /// Number of entries currently held by storage.
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.inner.storage.evict_expired(Instant::now());
    self.inner.storage.len()
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}
