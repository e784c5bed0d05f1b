use std::net::SocketAddr;

use aegis_metrics::gather_default_metrics;
use axum::{Router, http::HeaderValue, response::IntoResponse, routing::get};
use tracing::warn;

/// Serve the prometheus text endpoint for the lifetime of the process.
pub async fn serve(address: SocketAddr) {
    let app = Router::new()
        .route("/metrics", get(get_metrics))
        .route("/health", get(get_health));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .expect("Failed to bind metrics address");
    axum::serve(listener, app)
        .await
        .expect("Metrics server failed");
}

async fn get_health() -> impl IntoResponse {
    r#"{"status": "healthy", "service": "aegis"}"#
}

async fn get_metrics() -> impl IntoResponse {
    let mut response = gather_default_metrics()
        .inspect_err(|err| {
            warn!(%err, "Failed to gather Prometheus metrics");
        })
        .unwrap_or_default()
        .into_response();
    let content_type = HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8");
    response.headers_mut().insert("content-type", content_type);
    response
}
