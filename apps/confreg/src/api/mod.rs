//! # confreg HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Public Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /fees` - Published fee schedule
//! - `POST /fees/quote` - Price a selection
//! - `POST /registrations` - Submit a completed registration
//! - `GET /content/{slug}` - Page content
//! - `POST /abstracts` - Submit an abstract
//!
//! ## Admin Endpoints (`X-User-Id`, optional `X-Impersonation-Token`)
//!
//! - `GET /admin/registrations`, `GET /admin/registrations/{id}`,
//!   `POST /admin/registrations/moderate`
//! - `GET|POST /admin/users`, `PUT /admin/users/{id}/role`
//! - `GET|POST|DELETE /admin/impersonation`
//! - `GET /admin/audit`
//! - `GET /admin/content`, `PUT /admin/content/{slug}`
//! - `GET /admin/abstracts`, `POST /admin/abstracts/{id}/review`
//! - `GET /admin/stats`
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `CONFREG_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `CONFREG_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `CONFREG_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod extract;
mod handlers;
mod middleware;
mod types;

pub use auth::{Caller, IMPERSONATION_HEADER, USER_ID_HEADER, get_api_key_from_env};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ApiError, AuditQuery, ContentResponse, ErrorResponse, FeesResponse, GrantView,
    HealthResponse, ImpersonateRequest, ModerateRequest, ModerateResponse, RegistrationResponse,
    ReviewRequest, SetRoleRequest, StatusQuery,
};

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use confreg_core::{BackOffice, ConfError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the back office.
#[derive(Clone)]
pub struct AppState {
    pub office: Arc<RwLock<BackOffice>>,
}

impl AppState {
    #[must_use]
    pub fn new(office: BackOffice) -> Self {
        Self {
            office: Arc::new(RwLock::new(office)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

fn cors_headers() -> [HeaderName; 4] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(USER_ID_HEADER),
        HeaderName::from_static(IMPERSONATION_HEADER),
    ]
}

/// Build CORS layer from `CONFREG_CORS_ORIGINS`.
///
/// - `*`: allows all origins (development only)
/// - unset: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("CONFREG_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (CONFREG_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in CONFREG_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers(cors_headers())
            }
        }
        None => {
            tracing::info!("CORS: No CONFREG_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer for local front-end development.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers(cors_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - global quota (if enabled)
/// 4. Authentication - API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - admin routes rely on X-User-Id alone! \
             Set CONFREG_API_KEY environment variable to enable authentication."
        );
    }

    let admin = Router::new()
        .route("/registrations", get(handlers::registrations_handler))
        .route("/registrations/moderate", post(handlers::moderate_handler))
        .route("/registrations/{id}", get(handlers::registration_handler))
        .route(
            "/users",
            get(handlers::list_users_handler).post(handlers::create_user_handler),
        )
        .route("/users/{id}/role", put(handlers::set_role_handler))
        .route(
            "/impersonation",
            get(handlers::active_impersonations_handler)
                .post(handlers::start_impersonation_handler)
                .delete(handlers::end_impersonation_handler),
        )
        .route("/audit", get(handlers::audit_handler))
        .route("/content", get(handlers::list_pages_handler))
        .route("/content/{slug}", put(handlers::put_page_handler))
        .route("/abstracts", get(handlers::list_abstracts_handler))
        .route("/abstracts/{id}/review", post(handlers::review_abstract_handler))
        .route("/stats", get(handlers::stats_handler));

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/fees", get(handlers::fees_handler))
        .route("/fees/quote", post(handlers::quote_handler))
        .route("/registrations", post(handlers::register_handler))
        .route("/content/{slug}", get(handlers::content_handler))
        .route("/abstracts", post(handlers::submit_abstract_handler))
        .nest("/admin", admin);

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, office: BackOffice) -> Result<(), ConfError> {
    let state = AppState::new(office);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ConfError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("confreg HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConfError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
