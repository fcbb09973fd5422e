//! Development relay: forwards `/api/*` to the DART host and adds CORS.
//!
//! Browser front-ends cannot call the DART host directly, so this server
//! sits in between during development. It is a plain pass-through; it does
//! not cache and does not add the credential.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use color_eyre::{eyre::eyre, Result};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::RelayConfig;

#[derive(Clone)]
struct RelayState {
  http: reqwest::Client,
  upstream: String,
}

/// Build the relay router for the given config.
pub fn router(config: &RelayConfig) -> Result<Router> {
  let http = reqwest::Client::builder()
    .user_agent(concat!("dartdash-relay/", env!("CARGO_PKG_VERSION")))
    .build()
    .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

  let state = RelayState {
    http,
    upstream: config.upstream.trim_end_matches('/').to_string(),
  };

  Ok(
    Router::new()
      .route("/health", get(health))
      .route("/api/{*path}", any(forward))
      .with_state(state)
      .layer(cors_layer(&config.allowed_origins)?),
  )
}

/// Bind and serve until the process is terminated.
pub async fn run(config: &RelayConfig) -> Result<()> {
  let app = router(config)?;
  let addr = format!("127.0.0.1:{}", config.port);
  let listener = tokio::net::TcpListener::bind(&addr)
    .await
    .map_err(|e| eyre!("Failed to bind relay to {}: {}", addr, e))?;

  tracing::info!(%addr, upstream = %config.upstream, "relay listening");
  axum::serve(listener, app)
    .await
    .map_err(|e| eyre!("Relay server error: {}", e))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
  let origins = origins
    .iter()
    .map(|origin| {
      origin
        .parse::<HeaderValue>()
        .map_err(|e| eyre!("Invalid CORS origin {:?}: {}", origin, e))
    })
    .collect::<Result<Vec<_>>>()?;

  tracing::debug!(?origins, "CORS allow-list");
  Ok(
    CorsLayer::new()
      .allow_origin(origins)
      .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
      .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
      .allow_credentials(true),
  )
}

async fn health() -> Json<serde_json::Value> {
  Json(json!({ "status": "OK", "message": "Relay is running" }))
}

async fn forward(
  State(state): State<RelayState>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
  body: Bytes,
) -> Response {
  // The query string carries the credential and is never logged
  tracing::info!(%method, path = uri.path(), "relaying");

  let path_and_query = uri
    .path_and_query()
    .map(|pq| pq.as_str())
    .unwrap_or_else(|| uri.path());
  let url = format!("{}{}", state.upstream, path_and_query);

  let mut request = state.http.request(method, url).body(body);
  if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
    request = request.header(header::CONTENT_TYPE, content_type.clone());
  }

  match relay_response(request).await {
    Ok(response) => response,
    Err(err) => {
      tracing::error!(error = %err.without_url(), path = uri.path(), "relay upstream error");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Relay upstream error" })),
      )
        .into_response()
    }
  }
}

async fn relay_response(request: reqwest::RequestBuilder) -> Result<Response, reqwest::Error> {
  let upstream = request.send().await?;
  let status = upstream.status();
  let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
  let body = upstream.bytes().await?;

  let mut response = (status, body).into_response();
  if let Some(content_type) = content_type {
    response
      .headers_mut()
      .insert(header::CONTENT_TYPE, content_type);
  }
  Ok(response)
}
