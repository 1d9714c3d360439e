//! Structured logging configuration.
//!
//! Sets up `tracing-subscriber` and provides helpers for security events and
//! request summaries.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var. Records emitted
/// through the `log` facade by the `tokengate` library are forwarded.
///
/// # Example
///
/// ```no_run
/// use tg_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // `try_init` also installs the `log` bridge
    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        eprintln!("Logging already initialized: {e}");
        return;
    }

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `email` - Account the event concerns, if known
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use tg_server::logging::log_security_event;
///
/// log_security_event("failed_login", Some("a@x.com"), "Incorrect password");
/// ```
pub fn log_security_event(event_type: &str, email: Option<&str>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        email = email,
        "SECURITY: {}",
        message
    );
}

/// Log API request/response
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    if status_code >= 500 {
        tracing::error!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_security_event() {
        // Just ensure it doesn't panic
        log_security_event("refresh_reuse", Some("a@x.com"), "Stale refresh token presented");
        log_security_event("invalid_token", None, "Bad signature");
    }

    #[test]
    fn test_log_api_request() {
        log_api_request("POST", "/login", 200, 45);
        log_api_request("POST", "/signup", 500, 120);
    }

    #[test]
    fn test_init_twice() {
        init();
        init();
    }
}
