/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use cosmic_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = cosmic_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::Config,
    error::ErrorResponse,
    live::LiveFeed,
    middleware::{
        auth::auth_layer,
        rate_limit::{rate_limit_layer, RateLimiter, REQUESTS_PER_WINDOW, WINDOW_SECONDS},
        security::SecurityHeadersLayer,
    },
    routes,
};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Live event broadcast channel
    pub live: LiveFeed,

    /// Global per-IP rate limiter
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            live: LiveFeed::new(),
            rate_limiter: Arc::new(RateLimiter::new(REQUESTS_PER_WINDOW, WINDOW_SECONDS)),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api
/// ├── /health                       # Liveness + database connectivity
/// ├── /auth                         # register, login, refresh, me, password
/// ├── /portfolio                    # Project gallery, likes, comments
/// ├── /guestbook                    # Public guestbook + moderation
/// ├── /contact                      # Contact form + admin review
/// ├── /users                        # Profiles, leaderboard, admin management
/// ├── /analytics                    # Event ingest + admin dashboard
/// └── /live/events                  # SSE live feed
/// (everything else)                 # Static frontend with SPA fallback
/// ```
///
/// # Middleware Stack
///
/// Outermost to innermost on `/api`: security headers, CORS, tracing,
/// compression, rate limiting, authentication. Unknown `/api` paths get the
/// JSON 404 envelope rather than the SPA fallback.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me).put(routes::auth::update_me))
        .route("/password", put(routes::auth::change_password));

    let portfolio_routes = Router::new()
        .route("/", get(routes::portfolio::list).post(routes::portfolio::create))
        .route("/featured", get(routes::portfolio::featured))
        .route("/trending", get(routes::portfolio::trending))
        .route("/categories", get(routes::portfolio::categories))
        .route("/user/:user_id", get(routes::portfolio::by_user))
        .route(
            "/:id",
            get(routes::portfolio::get_one)
                .put(routes::portfolio::update)
                .delete(routes::portfolio::remove),
        )
        .route("/:id/like", post(routes::portfolio::toggle_like))
        .route("/:id/comment", post(routes::portfolio::add_comment));

    let guestbook_routes = Router::new()
        .route("/", get(routes::guestbook::list).post(routes::guestbook::create))
        .route("/featured", get(routes::guestbook::featured))
        .route("/categories", get(routes::guestbook::categories))
        .route(
            "/:id",
            get(routes::guestbook::get_one).delete(routes::guestbook::remove),
        )
        .route("/:id/like", post(routes::guestbook::toggle_like))
        .route("/:id/reply", post(routes::guestbook::add_reply))
        .route("/:id/flag", post(routes::guestbook::flag))
        .route("/:id/moderate", put(routes::guestbook::moderate));

    let contact_routes = Router::new()
        .route("/", post(routes::contact::create).get(routes::contact::list))
        .route("/:id", delete(routes::contact::remove))
        .route("/:id/status", put(routes::contact::set_status));

    let user_routes = Router::new()
        .route("/", get(routes::users::list))
        .route("/leaderboard", get(routes::users::leaderboard))
        .route("/stats", get(routes::users::stats))
        .route(
            "/:id",
            get(routes::users::get_profile).delete(routes::users::remove),
        )
        .route("/:id/role", put(routes::users::set_role))
        .route("/:id/status", put(routes::users::set_status))
        .route("/:id/achievement", post(routes::users::award_achievement))
        .route("/:id/activity", get(routes::users::activity));

    let analytics_routes = Router::new()
        .route("/event", post(routes::analytics::track_event))
        .route("/events", get(routes::analytics::list_events))
        .route("/dashboard", get(routes::analytics::dashboard));

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .nest("/portfolio", portfolio_routes)
        .nest("/guestbook", guestbook_routes)
        .nest("/contact", contact_routes)
        .nest("/users", user_routes)
        .nest("/analytics", analytics_routes)
        .route("/live/events", get(routes::live::events))
        .fallback(api_not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Static frontend: any non-API path falls back to index.html so client
    // side routing works on hard refresh
    let static_dir = &state.config.api.static_dir;
    let index = format!("{}/index.html", static_dir);
    let frontend = ServeDir::new(static_dir).not_found_service(ServeFile::new(index));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(frontend)
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JSON 404 for unknown API paths
async fn api_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not_found".to_string(),
            message: "API endpoint not found".to_string(),
            details: None,
        }),
    )
}
