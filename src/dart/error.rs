//! Error taxonomy for the DART query layer.

/// Errors produced by the registry, mapper, executor and cache.
///
/// Variants carry owned strings so a single failure can be handed to every
/// waiter of a coalesced request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DartError {
  /// The operation identifier is not registered. Indicates a misconfigured registry.
  #[error("unknown operation: {0}")]
  UnknownOperation(String),

  /// A required parameter was not supplied; no request was sent.
  #[error("{operation}: missing required parameter `{field}`")]
  MissingRequiredParameter {
    operation: &'static str,
    field: &'static str,
  },

  /// The request did not complete within the configured timeout.
  #[error("request timed out after {timeout_ms} ms")]
  RequestTimeout { timeout_ms: u64 },

  /// Transport failure, non-2xx response, undecodable body, or a DART error status.
  #[error("{}", request_failed_message(.status, .message))]
  ApiRequestFailed {
    status: Option<String>,
    message: String,
  },
}

fn request_failed_message(status: &Option<String>, message: &str) -> String {
  match status {
    Some(status) => format!("API request failed ({}): {}", status, message),
    None => format!("API request failed: {}", message),
  }
}

impl DartError {
  pub fn request_failed(message: impl Into<String>) -> Self {
    Self::ApiRequestFailed {
      status: None,
      message: message.into(),
    }
  }

  pub fn request_failed_with_status(status: impl Into<String>, message: impl Into<String>) -> Self {
    Self::ApiRequestFailed {
      status: Some(status.into()),
      message: message.into(),
    }
  }

  /// Transient failures the caller may re-invoke.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      Self::RequestTimeout { .. } | Self::ApiRequestFailed { .. }
    )
  }
}
