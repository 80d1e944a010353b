/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use gymgate_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = gymgate_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use gymgate_shared::auth::middleware::{device_key_auth_middleware, AuthError};
use gymgate_shared::checkin::{AttendanceEngine, PgMemberDirectory, PgSessionStore};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// The engine wired to its PostgreSQL stores
pub type PgAttendanceEngine = AttendanceEngine<PgMemberDirectory, PgSessionStore>;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// The attendance engine, one instance shared by all requests
    pub engine: Arc<PgAttendanceEngine>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        let engine = AttendanceEngine::new(
            PgMemberDirectory::new(db.clone()),
            PgSessionStore::new(db.clone()),
        );

        Self {
            db,
            config: Arc::new(config),
            engine: Arc::new(engine),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # Health check (public)
/// └── /v1/                            # Device-key authenticated
///     ├── POST /attendance/scan           # Toggle check-in/out
///     ├── POST /attendance/auto-checkout  # On-demand sweep
///     └── GET  /members/:code/badge       # QR badge payload + image
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Device-key authentication (on /v1 only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Kiosk routes (require a device key)
    let v1_routes = Router::new()
        .route("/attendance/scan", post(routes::attendance::scan))
        .route(
            "/attendance/auto-checkout",
            post(routes::attendance::auto_checkout),
        )
        .route("/members/:code/badge", get(routes::badge::member_badge))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            device_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static("x-api-key")])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Device-key authentication middleware layer
///
/// Delegates to the shared middleware with this app's pool; on success a
/// `DeviceContext` is available in request extensions.
async fn device_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    device_key_auth_middleware(state.db.clone(), req, next).await
}
