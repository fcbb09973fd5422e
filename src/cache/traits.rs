//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::dart::DartError;

/// Identity of a cacheable query.
///
/// Two keys with the same `cache_hash` share a cache entry and an in-flight
/// request.
pub trait QueryKey {
  /// Stable, fixed-length identity used for lookup and de-duplication
  fn cache_hash(&self) -> String;

  /// Human-readable form for logs. Must not contain secrets.
  fn description(&self) -> String;
}

/// How long a cached result stays fresh, and how long it is kept at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
  /// After this, the entry is stale: still served, but re-fetched on access
  pub fresh_for: Duration,
  /// After this long without a fetch or access, the entry is dropped
  pub retain_for: Duration,
}

impl CachePolicy {
  pub const fn new(fresh_for: Duration, retain_for: Duration) -> Self {
    Self {
      fresh_for,
      retain_for,
    }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched from the network
  pub cached_at: DateTime<Utc>,
  /// Set when a re-fetch failed and stale data is served in its place
  pub error: Option<DartError>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at,
      error: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>, is_stale: bool) -> Self {
    Self {
      data,
      source: if is_stale {
        CacheSource::CacheStale
      } else {
        CacheSource::CacheFresh
      },
      cached_at,
      error: None,
    }
  }

  /// Stale data served because the re-fetch failed.
  pub fn stale_with_error(data: T, cached_at: DateTime<Utc>, error: DartError) -> Self {
    Self {
      data,
      source: CacheSource::CacheStale,
      cached_at,
      error: Some(error),
    }
  }

  /// Convert the payload, keeping the metadata.
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
      cached_at: self.cached_at,
      error: self.error,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Data from cache past its freshness window
  CacheStale,
}

impl CacheSource {
  pub fn label(self) -> &'static str {
    match self {
      CacheSource::Network => "live",
      CacheSource::CacheFresh => "cached",
      CacheSource::CacheStale => "stale",
    }
  }
}
