//! Async query abstraction for data fetching with caching support.
//!
//! Inspired by TanStack Query, this module provides a `Query<K, T>` type that
//! tracks the request a view currently wants (its key), runs fetches on the
//! tokio runtime, and applies their results on the UI thread.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new();
//!
//! match client.prepare(&options) {
//!     Ok(prepared) => {
//!         let cached = client.peek(&prepared);
//!         let client = client.clone();
//!         query.set_request(prepared.key.clone(), cached, move || {
//!             let client = client.clone();
//!             let prepared = prepared.clone();
//!             async move { client.run(&prepared).await.map_err(|e| e.to_string()) }
//!         });
//!     }
//!     Err(e) => query.set_not_ready(e.to_string()),
//! }
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

use crate::cache::CacheResult;
use crate::dart::ApiResult;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// No request has been made yet
  Idle,
  /// Required inputs are missing; no request is sent
  NotReady(String),
  /// A fetch is pending. `previous` is shown in the meantime if present.
  Loading { previous: Option<T> },
  /// Query completed successfully
  Success(T),
  /// Query failed. `previous` is kept so the last good data stays visible.
  Error { message: String, previous: Option<T> },
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading { .. })
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error { .. })
  }

  /// Latest data available, including data kept while loading or after an error.
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      QueryState::Loading { previous } | QueryState::Error { previous, .. } => previous.as_ref(),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error { message, .. } => Some(message),
      _ => None,
    }
  }

  fn take_data(&mut self) -> Option<T> {
    match std::mem::replace(self, QueryState::Idle) {
      QueryState::Success(data) => Some(data),
      QueryState::Loading { previous } | QueryState::Error { previous, .. } => previous,
      _ => None,
    }
  }
}

/// Data that knows whether it holds any rows, for empty-state panels.
pub trait Emptiable {
  fn is_empty(&self) -> bool;
}

impl<T> Emptiable for ApiResult<T> {
  fn is_empty(&self) -> bool {
    self.list.is_empty()
  }
}

impl<T: Emptiable> Emptiable for CacheResult<T> {
  fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl<T: Emptiable> QueryState<T> {
  /// The request succeeded but returned nothing.
  pub fn is_empty_result(&self) -> bool {
    matches!(self, QueryState::Success(data) if data.is_empty())
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// A finished fetch, tagged with the request it belongs to.
struct Completion<K, T> {
  key: K,
  seq: u64,
  result: Result<T, String>,
}

/// Async query for data fetching with state management.
///
/// Query<K, T> encapsulates:
/// - The current request key and the closure that fetches it
/// - Idle/not-ready/loading/success/error states
/// - Async result handling via a channel
/// - Discarding results of requests that were superseded
pub struct Query<K, T> {
  state: QueryState<T>,
  key: Option<K>,
  fetcher: Option<FetcherFn<T>>,
  /// Sequence number of the latest request; older completions are dropped
  seq: u64,
  sender: mpsc::UnboundedSender<Completion<K, T>>,
  receiver: mpsc::UnboundedReceiver<Completion<K, T>>,
}

impl<K, T> Query<K, T>
where
  K: Clone + PartialEq + Send + 'static,
  T: Send + 'static,
{
  pub fn new() -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      state: QueryState::Idle,
      key: None,
      fetcher: None,
      seq: 0,
      sender,
      receiver,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the latest data, if any.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Key of the current request, if one is set.
  pub fn key(&self) -> Option<&K> {
    self.key.as_ref()
  }

  /// Point the query at a request.
  ///
  /// With a new key, any pending fetch is superseded and a fetch starts
  /// immediately. `placeholder` (typically a cached result) is shown while
  /// it loads. With the current key this is a no-op; use `refetch` to force.
  ///
  /// Returns `true` if a fetch was started.
  pub fn set_request<F, Fut>(&mut self, key: K, placeholder: Option<T>, fetcher: F) -> bool
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.key.as_ref() == Some(&key) && !matches!(self.state, QueryState::NotReady(_)) {
      return false;
    }

    self.key = Some(key);
    self.fetcher = Some(Box::new(move || Box::pin(fetcher())));
    self.start_fetch(placeholder);
    true
  }

  /// Required inputs are missing: drop the request and wait for valid ones.
  pub fn set_not_ready(&mut self, reason: impl Into<String>) {
    self.seq += 1;
    self.key = None;
    self.fetcher = None;
    self.state = QueryState::NotReady(reason.into());
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading or has no request.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    let previous = self.state.take_data();
    self.start_fetch(previous);
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    let previous = self.state.take_data();
    self.start_fetch(previous);
  }

  /// Poll for results from pending fetches.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Results for superseded requests are discarded. Call this in your
  /// event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    // Try to receive without blocking
    while let Ok(completion) = self.receiver.try_recv() {
      if completion.seq != self.seq || self.key.as_ref() != Some(&completion.key) {
        tracing::trace!(seq = completion.seq, current = self.seq, "discarding superseded result");
        continue;
      }

      self.state = match completion.result {
        Ok(data) => QueryState::Success(data),
        Err(message) => QueryState::Error {
          message,
          previous: self.state.take_data(),
        },
      };
      changed = true;
    }

    changed
  }

  /// Internal: start the fetch operation for the current request
  fn start_fetch(&mut self, previous: Option<T>) {
    let (Some(key), Some(fetcher)) = (&self.key, &self.fetcher) else {
      // Nothing to fetch; restore what we had
      if let Some(data) = previous {
        self.state = QueryState::Success(data);
      }
      return;
    };

    self.seq += 1;
    self.state = QueryState::Loading { previous };

    let completion_key = key.clone();
    let seq = self.seq;
    let sender = self.sender.clone();
    let future = fetcher();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the query may have been dropped
      let _ = sender.send(Completion {
        key: completion_key,
        seq,
        result,
      });
    });
  }
}

impl<K, T> Default for Query<K, T>
where
  K: Clone + PartialEq + Send + 'static,
  T: Send + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<K: std::fmt::Debug, T: std::fmt::Debug> std::fmt::Debug for Query<K, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("key", &self.key)
      .field("seq", &self.seq)
      .finish_non_exhaustive()
  }
}
