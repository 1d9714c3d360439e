//! HTTP API for the authentication server.
//!
//! # Modules
//!
//! - [`auth`]: Signup, login, refresh, logout and the profile route
//! - [`middleware`]: Bearer-token authentication for protected endpoints
//! - [`request_id`]: Request correlation ids, request logging and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! POST /signup    - Create account (public)
//! POST /login     - Login, returns token pair (public)
//! POST /refresh   - Rotate token pair (access + refresh token)
//! POST /logout    - Revoke the session holding the access token
//! GET  /me        - Authenticated profile (auth required)
//! GET  /health    - Health status (public)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tg_server::api::{AppState, create_router};
//! use tokengate::auth::{AuthConfig, AuthManager};
//! use tokengate::db::InMemoryCredentialStore;
//! use tokengate::session::InMemorySessionRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::development();
//! let auth_manager = AuthManager::new(
//!     &config,
//!     Arc::new(InMemoryCredentialStore::new()),
//!     Arc::new(InMemorySessionRegistry::from_config(&config)),
//! )?;
//!
//! let app = create_router(AppState::new(Arc::new(auth_manager), &config));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;
use tokengate::auth::{AuthConfig, AuthManager, RequestAuthenticator};
use tower_http::cors::CorsLayer;

use crate::metrics;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub authenticator: RequestAuthenticator,
    /// Cookie lifetimes for the token pair
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Mark token cookies `Secure` (HTTPS only)
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(auth_manager: Arc<AuthManager>, config: &AuthConfig) -> Self {
        Self {
            authenticator: auth_manager.authenticator(),
            auth_manager,
            access_token_ttl: config.access_token_ttl,
            refresh_token_ttl: config.refresh_token_ttl,
            secure_cookies: true,
        }
    }

    /// Allow token cookies over plain HTTP, e.g. for local development
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    // Public routes (handlers read their own tokens where needed)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout));

    // Protected routes (require authentication middleware)
    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": 404, "message": "Not Found" })),
    )
}

/// Health check endpoint for monitoring and load balancers.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","version":"0.1.0","activeSessions":3}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.auth_manager.sessions().active_count().await {
        Ok(count) => {
            metrics::active_sessions(count);
            (
                StatusCode::OK,
                Json(json!({
                    "status": "healthy",
                    "version": env!("CARGO_PKG_VERSION"),
                    "activeSessions": count,
                })),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Session registry health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
        }
    }
}
