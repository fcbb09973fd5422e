mod disclosure_list;
mod financial_info;

pub use disclosure_list::DisclosureListView;
pub use financial_info::{FinancialInfoView, StatementScope};

use serde::de::DeserializeOwned;
use std::future::Future;

use crate::cache::{CacheResult, QueryKey};
use crate::dart::cache::DartQueryKey;
use crate::dart::params::QueryOptions;
use crate::dart::{ApiResult, CachedDartClient, DartError, PreparedQuery};
use crate::query::Query;
use crate::ui::components::SearchForm;

/// Query state of a DART view: a cache-annotated page of rows
pub type DartQuery<T> = Query<DartQueryKey, CacheResult<ApiResult<T>>>;

/// Point `query` at the request built from the form.
///
/// `fetch` is the typed client call for the operation. A cached result for
/// the new key is shown while it loads. Validation failures put the query
/// in the not-ready state without any I/O. Returns the prepared request so
/// the view can invalidate it on refresh.
fn point_query<O, T, F, Fut>(
  client: &CachedDartClient,
  query: &mut DartQuery<T>,
  form: &SearchForm,
  options: O,
  fetch: F,
) -> Option<PreparedQuery>
where
  O: QueryOptions + Clone + Send + Sync + 'static,
  T: DeserializeOwned + Send + 'static,
  F: Fn(CachedDartClient, O) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<CacheResult<ApiResult<T>>, DartError>> + Send + 'static,
{
  let prepared = match client.prepare(&options) {
    Ok(prepared) => prepared,
    Err(err) => {
      query.set_not_ready(not_ready_reason(form, &err));
      return None;
    }
  };

  let placeholder = client.peek::<T>(&prepared);
  let fetch_client = client.clone();
  let started = query.set_request(prepared.key.clone(), placeholder, move || {
    let request = fetch(fetch_client.clone(), options.clone());
    async move { request.await.map_err(|e| error_message(&e)) }
  });
  if started {
    tracing::debug!(query = %prepared.key.description(), "view request");
  }
  Some(prepared)
}

/// Error text for the query state; transient failures get the retry hint.
fn error_message(err: &DartError) -> String {
  if err.is_retryable() {
    format!("{}\nPress 'r' to retry.", err)
  } else {
    err.to_string()
  }
}

fn not_ready_reason(form: &SearchForm, err: &DartError) -> String {
  match err {
    DartError::MissingRequiredParameter { field, .. } => {
      format!("{} is required", form.label_of(field).unwrap_or(field))
    }
    other => other.to_string(),
  }
}
