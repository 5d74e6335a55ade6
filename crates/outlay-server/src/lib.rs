//! Outlay Web Server
//!
//! Axum-based REST API around the Outlay core: statement upload and preview,
//! subscription detection and overspending analysis per session.
//!
//! Security features:
//! - Restrictive CORS policy (allow-list via `OUTLAY_ALLOWED_ORIGINS`)
//! - Upload size limit and `.csv` filename check
//! - Sessions expire after a configurable TTL
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info};

use outlay_core::{DetectionConfig, Error as CoreError, LedgerStore};

mod handlers;
mod reaper;

pub use reaper::{start_session_reaper, ReaperConfig};

/// Maximum statement size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Request body cap: a base64-encoded maximum-size statement plus form overhead
pub const MAX_REQUEST_BODY: usize = MAX_UPLOAD_SIZE / 3 * 4 + 64 * 1024;

/// Default session lifetime in minutes
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Sessions older than this are purged by the reaper
    pub session_ttl: chrono::Duration,
    /// Detector thresholds
    pub detection: DetectionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            session_ttl: chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            detection: DetectionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read `OUTLAY_ALLOWED_ORIGINS` (comma-separated) and `OUTLAY_SESSION_TTL_MINUTES`
    pub fn from_env() -> anyhow::Result<Self> {
        let allowed_origins =
            parse_origins(&std::env::var("OUTLAY_ALLOWED_ORIGINS").unwrap_or_default());

        let session_ttl = match std::env::var("OUTLAY_SESSION_TTL_MINUTES") {
            Ok(s) => parse_ttl_minutes(&s)?,
            Err(_) => chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
        };

        Ok(Self {
            allowed_origins,
            session_ttl,
            detection: DetectionConfig::default(),
        })
    }
}

/// Parse a session lifetime given in minutes
///
/// Must be positive and small enough for `chrono::Duration`.
pub fn parse_ttl_minutes(input: &str) -> anyhow::Result<chrono::Duration> {
    input
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|minutes| *minutes > 0)
        .and_then(chrono::Duration::try_minutes)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid OUTLAY_SESSION_TTL_MINUTES '{}': expected a positive number of minutes",
                input.trim()
            )
        })
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub config: ServerConfig,
}

/// Create the application router
pub fn create_router(store: Arc<dyn LedgerStore>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        store,
        config: config.clone(),
    });

    let api_routes = Router::new()
        // Statements
        .route("/upload", post(handlers::upload_statement))
        .route("/upload/json", post(handlers::upload_statement_json))
        .route("/preview", post(handlers::preview_statement))
        // Analysis
        .route("/subscriptions", get(handlers::get_subscriptions))
        .route("/overspending", get(handlers::get_overspending))
        // Sessions
        .route("/sessions/:id", delete(handlers::delete_session));

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    };

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(security_headers)
}

/// Start the server and its session reaper
pub async fn serve_with_config(
    store: Arc<dyn LedgerStore>,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.allowed_origins.is_empty() {
        info!(origins = ?config.allowed_origins, "CORS allow-list configured");
    }

    start_session_reaper(store.clone(), ReaperConfig::with_ttl(config.session_ttl));

    let app = create_router(store, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn payload_too_large(msg: &str) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error: statement problems are the caller's to fix and keep
    /// their message; everything else is reported generically
    pub fn from_core(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(_) => Self::not_found("Session not found or expired"),
            e if e.is_user_error() => Self::bad_request(&e.to_string()),
            e => Self::from(e),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "success": false,
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err.into()),
        }
    }
}

#[cfg(test)]
mod tests;
