//! Exposition server.
//!
//! Serves the registry's current snapshot over `GET /metrics` in the
//! Prometheus text format, plus a `/healthz` liveness probe. Handlers only
//! read the registry — they never call into collectors or block on source
//! I/O, so scraping stays available and correct even while collection
//! cycles are failing.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::metrics::{self, MetricRegistry};

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

/// Create the Axum router with all routes.
pub fn create_router(registry: Arc<MetricRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(registry)
}

/// Scrape endpoint: render whatever is in the registry right now.
async fn metrics_handler(State(registry): State<Arc<MetricRegistry>>) -> impl IntoResponse {
    let snapshot = registry.snapshot().await;
    let body = metrics::render(&snapshot);

    ([(header::CONTENT_TYPE, metrics::CONTENT_TYPE)], body)
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricDefinition, Sample};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_registry() -> Arc<MetricRegistry> {
        Arc::new(
            MetricRegistry::new(vec![
                MetricDefinition::gauge("esports_total_kills", "Total kills"),
                MetricDefinition::gauge_with_labels(
                    "weather_temperature_celsius",
                    "Current temperature in Celsius",
                    &["city"],
                ),
            ])
            .unwrap(),
        )
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn test_metrics_before_first_cycle_renders_headers_only() {
        let app = create_router(test_registry());
        let (status, body) = get_body(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("# HELP esports_total_kills Total kills"));
        assert!(body.contains("# TYPE esports_total_kills gauge"));
        assert!(body.contains("# TYPE weather_temperature_celsius gauge"));
        // No sample lines yet: every line is a header.
        assert!(body.lines().all(|line| line.starts_with('#')));
    }

    #[tokio::test]
    async fn test_metrics_renders_merged_samples() {
        let registry = test_registry();
        registry
            .merge(vec![
                Sample::new("esports_total_kills", 4500.0),
                Sample::with_labels("weather_temperature_celsius", &["London"], 18.5),
            ])
            .await;

        let app = create_router(Arc::clone(&registry));
        let (status, body) = get_body(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("esports_total_kills 4500"));
        assert!(body.contains("weather_temperature_celsius{city=\"London\"} 18.5"));
    }

    #[tokio::test]
    async fn test_metrics_content_type() {
        let app = create_router(test_registry());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = create_router(test_registry());
        let (status, body) = get_body(app, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
    }
}
