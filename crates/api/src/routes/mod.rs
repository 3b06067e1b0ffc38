//! API routes.

pub mod health;
pub mod pipeline;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Uri},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::middleware::track_requests;
use crate::response::ApiError;
use crate::state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

async fn fallback_handler(uri: Uri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.path()))
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.cors_origins))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::from_fn(track_requests));

    Router::new()
        .route("/v1/deduplicate", post(pipeline::deduplicate_handler))
        .route("/v1/customer-metrics", post(pipeline::customer_metrics_handler))
        .route(
            "/v1/customer-summaries",
            post(pipeline::customer_summaries_handler),
        )
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/admin/metrics", get(health::metrics_handler))
        .fallback(fallback_handler)
        .layer(middleware_stack)
        .with_state(state)
}
