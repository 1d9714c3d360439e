//! Authentication middleware for protected endpoints.
//!
//! Extracts the access token from the `Authorization: Bearer <token>` header,
//! checks it against the token codec and the session registry, then injects
//! the caller's [`AuthenticatedUser`] into request extensions.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware, extract::Extension};
//! use tokengate::auth::AuthenticatedUser;
//! # use tg_server::api::middleware::auth_middleware;
//! # use tg_server::api::AppState;
//! # let state: AppState = unimplemented!();
//!
//! async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
//!     format!("Authenticated as {}", user.email)
//! }
//!
//! let protected_routes: Router<AppState> = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
//! # let _ = protected_routes;
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tokengate::auth::{AuthError, bearer_token};

use super::{AppState, auth::ApiError};

/// Authentication middleware that validates the bearer token and injects the
/// authenticated user.
///
/// - **Success**: Injects `AuthenticatedUser` into request extensions
/// - **Missing or malformed header**: `401 Unauthorized`
/// - **Invalid, expired, rotated or revoked token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::Unauthorized)?;

    let user = state.authenticator.authenticate(token).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
