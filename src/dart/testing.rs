//! Test fixtures shared by the HTTP-facing modules.

use axum::Router;

/// Serve `router` on an ephemeral local port and return its address.
pub async fn serve(router: Router) -> std::net::SocketAddr {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });
  addr
}

/// Serve a mock upstream and return the API base URL pointing at it.
pub async fn mock_upstream(router: Router) -> String {
  format!("http://{}/api", serve(router).await)
}
