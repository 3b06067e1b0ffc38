//! Request counting middleware.

use axum::{extract::Request, middleware::Next, response::Response};
use telemetry::metrics;
use tracing::debug;

/// Counts requests, tracks in-flight work and records failed responses.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    metrics().requests_received.inc();
    metrics().in_flight_requests.inc();

    let response = next.run(request).await;

    metrics().in_flight_requests.dec();
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        metrics().requests_failed.inc();
        debug!(%method, %path, status = status.as_u16(), "Request failed");
    }

    response
}
