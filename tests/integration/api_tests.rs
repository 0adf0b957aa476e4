//! API integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test readiness endpoint (when full app state is available).
#[tokio::test]
#[ignore = "requires Redis and a reachable VOD upstream"]
async fn test_ready_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::OK || response.status() == StatusCode::SERVICE_UNAVAILABLE
    );
}

/// Test Prometheus metrics endpoint.
#[tokio::test]
async fn test_metrics_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::OK || response.status() == StatusCode::NOT_FOUND
    );
}

/// Test JSON metrics snapshot endpoint (only present on the real router).
#[tokio::test]
#[ignore = "requires Redis and a reachable VOD upstream"]
async fn test_metrics_json_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test the manual task trigger and queue status admin routes.
#[tokio::test]
#[ignore = "requires Redis and a reachable VOD upstream"]
async fn test_queue_status_endpoint() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/queue/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test CORS headers.
#[tokio::test]
async fn test_cors_headers() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/health")
                .header("Origin", "http://localhost:3000")
                .header("Access-Control-Request-Method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::OK || response.status() == StatusCode::NO_CONTENT
    );
}

/// Test security headers.
#[tokio::test]
async fn test_security_headers() {
    dotenvy::dotenv().ok();

    let app = create_test_router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();

    assert!(headers.contains_key("X-Content-Type-Options"));
    assert!(headers.contains_key("X-Frame-Options"));
    assert!(headers.contains_key("X-Request-ID"));
}

/// Helper to create a test router. Tries real application state first
/// (Redis + cities config + VOD upstream reachable), falling back to a
/// minimal router exposing just `/health` and `/metrics` for environments
/// without those dependencies.
async fn create_test_router() -> axum::Router {
    use vod_api::{create_router, metrics, ApiConfig, AppState};

    std::env::set_var("BROKER_URL", std::env::var("BROKER_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()));
    std::env::set_var("CITIES_CONFIG", std::env::var("CITIES_CONFIG").unwrap_or_else(|_| "{}".to_string()));

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(_) => return minimal_router(),
    };

    match AppState::new(config).await {
        Ok(state) => {
            let metrics_handle = Some(metrics::init_metrics());
            create_router(state, metrics_handle)
        }
        Err(_) => minimal_router(),
    }
}

fn minimal_router() -> axum::Router {
    use axum::routing::get;
    use axum::Json;
    use serde_json::json;

    axum::Router::new()
        .route(
            "/health",
            get(|| async {
                Json(json!({
                    "status": "healthy",
                    "version": env!("CARGO_PKG_VERSION")
                }))
            }),
        )
        .route("/metrics", get(|| async { "# No metrics" }))
}
