//! Authentication API handlers.
//!
//! This module provides HTTP REST endpoints for:
//! - Account signup with email, name and password
//! - Login returning an access/refresh token pair
//! - Token refresh with rotation
//! - Logout revoking the caller's session
//!
//! All endpoints answer with a `{status, message, data?}` envelope on success
//! and `{status, message}` (or a list of field errors) on failure.
//!
//! # Examples
//!
//! Signup:
//! ```bash
//! curl -X POST http://localhost:6969/signup \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "player@example.com", "name": "Player One", "password": "SecurePass123"}'
//! ```
//!
//! Refresh using headers:
//! ```bash
//! curl -X POST http://localhost:6969/refresh \
//!   -H "Authorization: Bearer $ACCESS" \
//!   -H "X-Refresh-Token: $REFRESH"
//! ```

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokengate::auth::{AuthError, AuthenticatedUser, LogoutOutcome, SessionTokens, bearer_token};

use super::AppState;
use crate::{logging, metrics};

/// Header carrying the refresh token when cookies are not used
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

pub const SUCCESS_USER_CREATED: &str = "User Created Successfuly";
pub const SUCCESS_USER_LOGIN: &str = "User Logged In Successfuly";
pub const SUCCESS_USER_LOGGED_OUT: &str = "User Logged Out Successfuly";
pub const SUCCESS_TOKENS_SET: &str = "Succesfully Set Tokens";
pub const ERR_ALREADY_LOGGED_OUT: &str = "You're already logged out";

#[derive(Debug, Deserialize)]
pub struct SignupPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub email: String,
    pub name: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub email: String,
    pub name: String,
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub status: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> SuccessResponse<T> {
    fn ok(message: &'static str, data: Option<T>) -> Json<Self> {
        Json(Self {
            status: StatusCode::OK.as_u16(),
            message,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub error: Vec<ErrorResponse>,
}

/// Errors surfaced by the HTTP layer
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Validation(Vec<String>),
    BadRequest(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

/// HTTP status for a core error
pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::AlreadyExists => StatusCode::CONFLICT,
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidCredentials => StatusCode::FORBIDDEN,
        AuthError::TokenInvalid
        | AuthError::TokenExpired
        | AuthError::StaleRefreshToken
        | AuthError::SessionRevoked
        | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::Database(_)
        | AuthError::Jwt(_)
        | AuthError::Internal(_)
        | AuthError::HashingFailed
        | AuthError::MalformedHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => {
                let status = status_for(&e);
                if e.is_internal() {
                    tracing::error!(error = %e, "Request failed with internal error");
                }
                let body = ErrorResponse {
                    status: status.as_u16(),
                    message: e.client_message(),
                };
                (status, Json(body)).into_response()
            }
            ApiError::Validation(messages) => {
                let body = ValidationErrorResponse {
                    error: messages
                        .into_iter()
                        .map(|message| ErrorResponse {
                            status: StatusCode::BAD_REQUEST.as_u16(),
                            message,
                        })
                        .collect(),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::BadRequest(message) => {
                let body = ErrorResponse {
                    status: StatusCode::BAD_REQUEST.as_u16(),
                    message,
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

fn required(field: &str, value: &str, errors: &mut Vec<String>) -> bool {
    if value.trim().is_empty() {
        errors.push(format!("'{field}' is a required field"));
        false
    } else {
        true
    }
}

fn length(field: &str, value: &str, min: usize, max: usize, errors: &mut Vec<String>) {
    let len = value.chars().count();
    if len < min {
        errors.push(format!("'{field}' must be atleast {min} characters"));
    } else if len > max {
        errors.push(format!("'{field}' must be less than {max} characters"));
    }
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains("..")
        }
        None => false,
    }
}

fn email(field: &str, value: &str, errors: &mut Vec<String>) {
    if required(field, value, errors) && !is_valid_email(value) {
        errors.push(format!("'{field}' is invalid"));
    }
}

fn password(field: &str, value: &str, errors: &mut Vec<String>) {
    if required(field, value, errors) {
        length(field, value, 8, 50, errors);
    }
}

impl SignupPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();

        email("Email", &self.email, &mut errors);
        if required("Name", &self.name, &mut errors) {
            length("Name", self.name.trim(), 2, 50, &mut errors);
        }
        password("Password", &self.password, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

impl LoginPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();

        email("Email", &self.email, &mut errors);
        password("Password", &self.password, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

fn parse_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Cookies
// ============================================================================

/// Find a cookie value across all `Cookie` headers
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

fn set_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{name}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Strict{secure}")
}

fn access_token_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .or_else(|| cookie(headers, ACCESS_TOKEN_COOKIE))
}

fn refresh_token_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| cookie(headers, REFRESH_TOKEN_COOKIE))
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new account.
///
/// # Request Body
///
/// ```json
/// {"email": "player@example.com", "name": "Player One", "password": "SecurePass123"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or field validation failure
/// - `409 Conflict`: Email already registered
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupPayload>, JsonRejection>,
) -> Result<Json<SuccessResponse<()>>, ApiError> {
    let payload = parse_payload(payload)?;
    payload.validate()?;

    match state
        .auth_manager
        .signup(&payload.email, payload.name.trim(), &payload.password)
        .await
    {
        Ok(_) => {
            metrics::signups_total(true);
            Ok(SuccessResponse::ok(SUCCESS_USER_CREATED, None))
        }
        Err(e) => {
            metrics::signups_total(false);
            Err(e.into())
        }
    }
}

/// Authenticate with email and password and start a session.
///
/// # Response
///
/// ```json
/// {
///   "status": 200,
///   "message": "User Logged In Successfuly",
///   "data": {"email": "...", "name": "...", "accessToken": "...", "refreshToken": "..."}
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or field validation failure
/// - `404 Not Found`: No account for this email
/// - `403 Forbidden`: Incorrect password
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<SuccessResponse<LoginResponse>>, ApiError> {
    let payload = parse_payload(payload)?;
    payload.validate()?;

    match state
        .auth_manager
        .login(&payload.email, &payload.password)
        .await
    {
        Ok((account, tokens)) => {
            metrics::login_attempts_total(true);
            Ok(SuccessResponse::ok(
                SUCCESS_USER_LOGIN,
                Some(LoginResponse {
                    email: account.email,
                    name: account.name,
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                }),
            ))
        }
        Err(e) => {
            metrics::login_attempts_total(false);
            if matches!(e, AuthError::InvalidCredentials) {
                logging::log_security_event(
                    "failed_login",
                    Some(payload.email.trim()),
                    "Incorrect password",
                );
            }
            Err(e.into())
        }
    }
}

/// Exchange the current token pair for a new one.
///
/// Tokens are read from `Authorization: Bearer <access>` plus
/// `X-Refresh-Token: <refresh>`, falling back to the `access_token` and
/// `refresh_token` cookies. The new pair is returned in the body and set as
/// cookies.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, expired or already rotated tokens
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (Some(access_token), Some(refresh_token)) =
        (access_token_from(&headers), refresh_token_from(&headers))
    else {
        metrics::refreshes_total(false);
        return Err(AuthError::TokenInvalid.into());
    };

    let SessionTokens {
        access_token,
        refresh_token,
    } = match state.auth_manager.refresh(access_token, refresh_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            metrics::refreshes_total(false);
            if matches!(e, AuthError::StaleRefreshToken) {
                metrics::refresh_reuse_total();
                logging::log_security_event(
                    "refresh_reuse",
                    None,
                    "Rotated refresh token presented again",
                );
            }
            return Err(e.into());
        }
    };

    metrics::refreshes_total(true);

    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            set_cookie(
                ACCESS_TOKEN_COOKIE,
                &access_token,
                state.access_token_ttl.num_seconds(),
                state.secure_cookies,
            ),
        ),
        (
            header::SET_COOKIE,
            set_cookie(
                REFRESH_TOKEN_COOKIE,
                &refresh_token,
                state.refresh_token_ttl.num_seconds(),
                state.secure_cookies,
            ),
        ),
    ]);

    let body = SuccessResponse::ok(
        SUCCESS_TOKENS_SET,
        Some(TokenPairResponse {
            access_token,
            refresh_token,
        }),
    );

    Ok((cookies, body).into_response())
}

/// Revoke the caller's session.
///
/// The access token must belong to the subject's live session. Once that
/// session is gone, logging out again with the same token reports it.
///
/// # Errors
///
/// - `400 Bad Request`: Already logged out
/// - `401 Unauthorized`: Missing or invalid token, or a token superseded by a
///   later login or refresh
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = access_token_from(&headers).ok_or(AuthError::Unauthorized)?;

    match state.auth_manager.logout(token).await? {
        LogoutOutcome::LoggedOut => {
            let secure = state.secure_cookies;
            let cookies = AppendHeaders([
                (header::SET_COOKIE, set_cookie(ACCESS_TOKEN_COOKIE, "", 0, secure)),
                (header::SET_COOKIE, set_cookie(REFRESH_TOKEN_COOKIE, "", 0, secure)),
            ]);
            let body = SuccessResponse::<()>::ok(SUCCESS_USER_LOGGED_OUT, None);
            Ok((cookies, body).into_response())
        }
        LogoutOutcome::AlreadyLoggedOut => {
            Err(ApiError::BadRequest(ERR_ALREADY_LOGGED_OUT.to_string()))
        }
    }
}

/// Profile of the authenticated caller.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<MeResponse>, ApiError> {
    let account = state.auth_manager.account(&user.email).await?;

    Ok(Json(MeResponse {
        email: account.email,
        name: account.name,
    }))
}
