use color_eyre::{eyre::eyre, Result};
use std::time::Duration;

use crate::config::ApiConfig;

use super::endpoints::EndpointSpec;
use super::error::DartError;
use super::params::{WireParams, CREDENTIAL_PARAM};
use super::types::{RawResult, STATUS_NO_DATA, STATUS_OK};

/// DART API client.
///
/// Issues exactly one GET per call with no retry, and never touches the
/// cache. All failures are normalized to [`DartError`].
#[derive(Clone)]
pub struct DartClient {
  http: reqwest::Client,
  base_url: String,
  timeout: Duration,
}

impl DartClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .user_agent(concat!("dartdash/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      timeout: config.timeout(),
    })
  }

  /// Run one operation against the upstream API.
  pub async fn execute(&self, spec: &EndpointSpec, wire: &WireParams) -> Result<RawResult, DartError> {
    let url = format!("{}{}", self.base_url, spec.path);
    tracing::debug!(operation = spec.id, params = %redacted(wire), "sending request");

    let result = match tokio::time::timeout(self.timeout, self.send(&url, wire)).await {
      Ok(result) => result,
      Err(_) => Err(DartError::RequestTimeout {
        timeout_ms: self.timeout.as_millis() as u64,
      }),
    };

    match &result {
      Ok(raw) => tracing::debug!(operation = spec.id, rows = raw.list.len(), "request succeeded"),
      Err(err) => tracing::warn!(operation = spec.id, error = %err, "request failed"),
    }

    result
  }

  async fn send(&self, url: &str, wire: &WireParams) -> Result<RawResult, DartError> {
    let response = self
      .http
      .get(url)
      .query(wire)
      .send()
      .await
      .map_err(transport_error)?;

    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
      // Prefer the upstream's own message when the error body is an envelope
      let message = serde_json::from_str::<RawResult>(&body)
        .map(|envelope| envelope.message)
        .unwrap_or_else(|_| {
          status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string()
        });
      return Err(DartError::request_failed_with_status(status.as_str(), message));
    }

    parse_envelope(&body)
  }
}

/// Decode a response body and apply DART status handling.
///
/// `000` is success. `013` (no data) is success with an empty list. Any
/// other status is a failure carrying the upstream message.
pub fn parse_envelope(body: &str) -> Result<RawResult, DartError> {
  let mut raw: RawResult = serde_json::from_str(body)
    .map_err(|e| DartError::request_failed(format!("invalid response body: {}", e)))?;

  match raw.status.as_str() {
    STATUS_OK => Ok(raw),
    STATUS_NO_DATA => {
      raw.list.clear();
      Ok(raw)
    }
    _ => Err(DartError::request_failed_with_status(raw.status, raw.message)),
  }
}

/// reqwest errors embed the request URL, which carries the credential.
fn transport_error(err: reqwest::Error) -> DartError {
  DartError::request_failed(err.without_url().to_string())
}

/// Wire parameters with the credential masked, for logs.
fn redacted(wire: &WireParams) -> String {
  wire
    .iter()
    .map(|(name, value)| {
      if name == CREDENTIAL_PARAM {
        format!("{}=***", name)
      } else {
        format!("{}={}", name, value)
      }
    })
    .collect::<Vec<_>>()
    .join("&")
}
