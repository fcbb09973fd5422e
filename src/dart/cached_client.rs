//! Cached DART client that wraps DartClient with transparent caching.

use color_eyre::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::Instant;

use crate::cache::{
  CacheLayer, CachePolicy, CacheResult, CacheStorage, CachedEntry, MemoryStorage, NoopStorage,
  QueryKey,
};
use crate::config::Config;

use super::cache::DartQueryKey;
use super::client::DartClient;
use super::endpoints::EndpointSpec;
use super::error::DartError;
#[cfg(test)]
use super::params::CompanyListOptions;
use super::params::{
  map_params, DisclosureListOptions, FinancialInfoOptions, MainInfoOptions, QueryOptions,
  WireParams,
};
#[cfg(test)]
use super::types::CompanyInfo;
use super::types::{ApiResult, DisclosureInfo, FinancialInfo, RawResult};

/// Cached payload: the untyped envelope, shared between waiters.
pub type SharedResult = Arc<RawResult>;

/// Storage selected by `cache.enabled`.
pub enum ResultStorage {
  Memory(MemoryStorage<SharedResult>),
  Disabled(NoopStorage<SharedResult>),
}

impl CacheStorage for ResultStorage {
  type Value = SharedResult;

  fn get(&self, hash: &str, now: Instant) -> Option<CachedEntry<SharedResult>> {
    match self {
      Self::Memory(s) => s.get(hash, now),
      Self::Disabled(s) => s.get(hash, now),
    }
  }

  fn store(&self, hash: &str, value: SharedResult, policy: CachePolicy, now: Instant) {
    match self {
      Self::Memory(s) => s.store(hash, value, policy, now),
      Self::Disabled(s) => s.store(hash, value, policy, now),
    }
  }

  fn remove(&self, hash: &str) {
    match self {
      Self::Memory(s) => s.remove(hash),
      Self::Disabled(s) => s.remove(hash),
    }
  }

  fn clear(&self) {
    match self {
      Self::Memory(s) => s.clear(),
      Self::Disabled(s) => s.clear(),
    }
  }

  fn evict_expired(&self, now: Instant) -> usize {
    match self {
      Self::Memory(s) => s.evict_expired(now),
      Self::Disabled(s) => s.evict_expired(now),
    }
  }

  fn len(&self) -> usize {
    match self {
      Self::Memory(s) => s.len(),
      Self::Disabled(s) => s.len(),
    }
  }
}

/// A validated request: everything needed to look it up or send it.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
  pub spec: &'static EndpointSpec,
  pub key: DartQueryKey,
  wire: WireParams,
}

/// DART client with transparent caching support.
///
/// This wraps the underlying DartClient, maps caller options to wire
/// parameters, and serves results through the cache layer.
pub struct CachedDartClient<S: CacheStorage<Value = SharedResult> = ResultStorage> {
  inner: DartClient,
  cache: CacheLayer<S>,
  api_key: Arc<str>,
}

impl CachedDartClient {
  /// Create a new cached DART client.
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;
    let inner = DartClient::new(&config.api)?;

    let storage = if config.cache.enabled {
      ResultStorage::Memory(MemoryStorage::new())
    } else {
      tracing::info!("result cache disabled by config");
      ResultStorage::Disabled(NoopStorage::new())
    };

    Ok(Self::with_storage(inner, storage, &api_key))
  }
}

impl<S: CacheStorage<Value = SharedResult>> CachedDartClient<S> {
  pub fn with_storage(inner: DartClient, storage: S, api_key: &str) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(storage),
      api_key: Arc::from(api_key),
    }
  }

  /// Validate options and build the cache key. Performs no I/O.
  pub fn prepare<O: QueryOptions>(&self, options: &O) -> Result<PreparedQuery, DartError> {
    let spec = options.operation().spec();
    let wire = map_params(spec, &options.to_raw(), &self.api_key)?;
    let key = DartQueryKey::new(spec.operation, &wire);

    Ok(PreparedQuery { spec, key, wire })
  }

  /// Serve a prepared query through the cache.
  pub async fn run<T: DeserializeOwned>(
    &self,
    prepared: &PreparedQuery,
  ) -> Result<CacheResult<ApiResult<T>>, DartError> {
    let spec = prepared.spec;
    let result = self
      .cache
      .fetch(&prepared.key, spec.policy, || {
        let inner = self.inner.clone();
        let wire = prepared.wire.clone();
        async move { inner.execute(spec, &wire).await.map(Arc::new) }
      })
      .await?;

    typed(result)
  }

  /// Cached result for a prepared query, without fetching.
  pub fn peek<T: DeserializeOwned>(&self, prepared: &PreparedQuery) -> Option<CacheResult<ApiResult<T>>> {
    self
      .cache
      .peek(&prepared.key)
      .and_then(|result| typed(result).ok())
  }

  /// Drop the cached result so the next run goes to the network.
  pub fn invalidate(&self, prepared: &PreparedQuery) {
    self.cache.invalidate(&prepared.key);
  }

  /// Drop every cached result and forget in-flight fetches.
  pub fn clear(&self) {
    self.cache.clear();
  }

  /// Validate, then serve through the cache.
  ///
  /// A missing required parameter fails before any network call.
  pub async fn query<O, T>(&self, options: &O) -> Result<CacheResult<ApiResult<T>>, DartError>
  where
    O: QueryOptions,
    T: DeserializeOwned,
  {
    let prepared = self.prepare(options)?;
    tracing::debug!(query = %prepared.key.description(), "query");
    self.run(&prepared).await
  }

  /// Corporation code registry.
  ///
  /// Upstream serves this as a zip archive, so no view uses it yet.
  #[cfg(test)]
  pub async fn company_list(&self) -> Result<CacheResult<ApiResult<CompanyInfo>>, DartError> {
    self.query(&CompanyListOptions).await
  }

  /// Disclosure search.
  pub async fn disclosure_list(
    &self,
    options: &DisclosureListOptions,
  ) -> Result<CacheResult<ApiResult<DisclosureInfo>>, DartError> {
    self.query(options).await
  }

  /// Key accounts of a periodic report.
  pub async fn financial_info(
    &self,
    options: &FinancialInfoOptions,
  ) -> Result<CacheResult<ApiResult<FinancialInfo>>, DartError> {
    self.query(options).await
  }

  /// Full financial statements of a periodic report.
  pub async fn main_info(
    &self,
    options: &MainInfoOptions,
  ) -> Result<CacheResult<ApiResult<FinancialInfo>>, DartError> {
    self.query(options).await
  }
}

impl<S: CacheStorage<Value = SharedResult>> Clone for CachedDartClient<S> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      cache: self.cache.clone(),
      api_key: Arc::clone(&self.api_key),
    }
  }
}

fn typed<T: DeserializeOwned>(
  result: CacheResult<SharedResult>,
) -> Result<CacheResult<ApiResult<T>>, DartError> {
  let data = result
    .data
    .to_typed()
    .map_err(|e| DartError::request_failed(format!("unexpected row shape: {}", e)))?;
  Ok(result.map(|_| data))
}
