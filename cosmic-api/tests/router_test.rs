//! Router-level tests
//!
//! These exercise the middleware stack and handler validation paths against
//! a lazily-connected pool, so no live database is required: every request
//! here is answered before a query runs (or, for the health check, after the
//! connection failure is caught and reported as degraded).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use cosmic_api::app::{build_router, AppState};
use cosmic_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};

fn test_state() -> AppState {
    let config = Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            static_dir: "static".to_string(),
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://postgres@localhost:1/cosmic_test".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret-key-at-least-32-bytes-long".to_string(),
        },
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        // Fail fast: without this, acquiring from the dead pool blocks for
        // the default 30s deadline on every request that touches the db
        .acquire_timeout(std::time::Duration::from_millis(50))
        .connect_lazy(&config.database.url)
        .expect("lazy pool");

    AppState::new(pool, config)
}

fn app() -> Router {
    build_router(test_state())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn unknown_api_path_returns_json_404() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/no-such-endpoint")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["database"], "disconnected");
}

#[tokio::test]
async fn register_rejects_invalid_email_with_field_details() {
    let body = serde_json::json!({
        "username": "astra",
        "email": "not-an-email",
        "password": "MyP@ssw0rd!"
    });

    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    let details = json["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d["field"] == "email"));
}

#[tokio::test]
async fn register_rejects_weak_password() {
    let body = serde_json::json!({
        "username": "astra",
        "email": "astra@example.com",
        "password": "alllowercase1"
    });

    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    let details = json["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d["field"] == "password"));
}

#[tokio::test]
async fn protected_route_requires_authentication() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn invalid_bearer_token_is_rejected_even_on_public_routes() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/guestbook")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authorization_header_is_bad_request() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/guestbook")
                .header(header::AUTHORIZATION, "Token abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_guestbook_post_requires_a_name() {
    let body = serde_json::json!({
        "message": "hello from the void"
    });

    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/guestbook")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn contact_form_enforces_message_length() {
    let body = serde_json::json!({
        "name": "Ada",
        "email": "ada@example.com",
        "subject": "Hi",
        "message": "too short"
    });

    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/contact")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    let details = json["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d["field"] == "message"));
}

#[tokio::test]
async fn api_responses_carry_security_and_rate_limit_headers() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
    assert!(headers.get("X-RateLimit-Limit").is_some());
    assert!(headers.get("X-RateLimit-Remaining").is_some());
    // Dev config: no HSTS
    assert!(headers.get("Strict-Transport-Security").is_none());
}

#[tokio::test]
async fn global_rate_limit_returns_429_with_retry_after() {
    let app = app();

    let mut last_status = StatusCode::OK;
    let mut retry_after = None;

    // The bucket holds 100 tokens; the 101st request from the same IP
    // must be rejected
    for _ in 0..101 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-forwarded-for", "203.0.113.50")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        last_status = response.status();
        retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
    }

    assert_eq!(last_status, StatusCode::TOO_MANY_REQUESTS);
    assert!(retry_after.is_some());
}

#[tokio::test]
async fn list_routes_accept_pagination_query_parameters() {
    // Query extraction runs before the handler's auth check, so a parse
    // failure on page/limit would surface as 400 here instead of 401
    for uri in ["/api/users?page=2&limit=5", "/api/contact?page=1&limit=20&status=new"] {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "expected 401 for {}",
            uri
        );
    }
}

#[tokio::test]
async fn admin_routes_reject_anonymous_callers() {
    for uri in [
        "/api/users",
        "/api/users/stats",
        "/api/contact",
        "/api/analytics/dashboard",
        "/api/analytics/events",
    ] {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "expected 401 for {}",
            uri
        );
    }
}
