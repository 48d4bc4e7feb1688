//! # kvreg HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Registry metadata and statistics
//! - `GET /entries/{codepoint}` - Entry by codepoint
//! - `GET /lookup?name=|uri=` - Entry by canonical name or URI
//! - `POST /validate` - Validate a request document (read-only)
//! - `POST /submit` - Validate and commit a request document
//! - `POST /export` - Canonical export (base64) with checksum
//! - `GET /hash` - Canonical checksum and BLAKE3 digest
//!
//! ## Server Configuration (Environment Variables)
//!
//! - `KVREG_SUBMIT_KEY`: If set, `POST /submit` requires `Authorization: Bearer <key>`
//! - `KVREG_SUBMIT_RATE_LIMIT`: Batches accepted per minute (default: 60, 0 disables)
//! - `KVREG_CORS_ORIGINS`: Comma-separated browser origins, or "*" (default: no CORS)

mod auth;
mod handlers;
mod middleware;
mod types;

pub use middleware::DEFAULT_SUBMISSIONS_PER_MINUTE;
pub use types::{
    BatchQuery, EntryResponse, ExportResponse, HashResponse, HealthResponse, LookupQuery,
    StatusResponse, SubmitResponse,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{MethodRouter, get, post},
};
use kvreg_core::{KvError, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Request body limit (2 MiB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Guards on the write path plus browser access. Reads are never gated.
///
/// `Default` is an open local server: no key, no submission limit, no CORS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bearer key required by `POST /submit`.
    pub submit_key: Option<String>,
    /// Batches accepted per minute across all submitters. 0 disables.
    pub submissions_per_minute: u32,
    /// Allowed browser origins. Empty disables CORS; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Read `KVREG_SUBMIT_KEY`, `KVREG_SUBMIT_RATE_LIMIT` and `KVREG_CORS_ORIGINS`.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let submit_key = var("KVREG_SUBMIT_KEY").filter(|k| !k.is_empty());
        let submissions_per_minute = match var("KVREG_SUBMIT_RATE_LIMIT") {
            None => DEFAULT_SUBMISSIONS_PER_MINUTE,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Invalid KVREG_SUBMIT_RATE_LIMIT '{}', using {}",
                    raw,
                    DEFAULT_SUBMISSIONS_PER_MINUTE
                );
                DEFAULT_SUBMISSIONS_PER_MINUTE
            }),
        };
        let cors_origins = var("KVREG_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            submit_key,
            submissions_per_minute,
            cors_origins,
        }
    }
}

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// Reads share the lock; a submission holds the write guard from validation
/// through commit and save.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    /// JSON registry file rewritten after every commit. `None` for redb,
    /// which persists on its own, and for purely in-memory servers.
    pub registry_path: Option<Arc<PathBuf>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            registry_path: None,
            config: Arc::new(ServerConfig::default()),
        }
    }

    /// Write the JSON registry back to `path` after each commit.
    #[must_use]
    pub fn persisting_to(mut self, path: PathBuf) -> Self {
        self.registry_path = Some(Arc::new(path));
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// `None` when no origin is configured, so same-origin tooling is unaffected.
fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allow = if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: allowing any origin (KVREG_CORS_ORIGINS=*)");
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(hv) => Some(hv),
                Err(e) => {
                    tracing::warn!("CORS: invalid origin '{}': {}", o, e);
                    None
                }
            })
            .collect();
        if parsed.is_empty() {
            return None;
        }
        tracing::info!("CORS: allowing {} origin(s)", parsed.len());
        AllowOrigin::list(parsed)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// `POST /submit` with its guards. The key check runs first, so only
/// authorized batches spend the submission budget.
fn submit_route(config: &ServerConfig) -> MethodRouter<AppState> {
    let mut route = post(handlers::submit_handler);

    if let Some(limiter) = middleware::submission_limiter(config.submissions_per_minute) {
        tracing::info!(
            "Submission limit: {} batches/minute",
            config.submissions_per_minute
        );
        route = route.route_layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::limit_submissions,
        ));
    } else {
        tracing::info!("Submission limit disabled");
    }

    match &config.submit_key {
        Some(key) => {
            tracing::info!("Submissions require a bearer key");
            route.route_layer(axum_middleware::from_fn_with_state(
                auth::SubmitKey::new(key),
                auth::require_submit_key,
            ))
        }
        None => {
            tracing::warn!(
                "Submissions are open to anyone. Set KVREG_SUBMIT_KEY to require a key."
            );
            route
        }
    }
}

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. Body limit
/// 3. CORS (if origins are configured)
/// 4. On `/submit` only: key check, then submission limit
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/entries/{codepoint}", get(handlers::entry_handler))
        .route("/lookup", get(handlers::lookup_handler))
        .route("/validate", post(handlers::validate_handler))
        .route("/submit", submit_route(&state.config))
        .route("/export", post(handlers::export_handler))
        .route("/hash", get(handlers::hash_handler));

    if let Some(cors) = build_cors_layer(&state.config.cors_origins) {
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve `state` on `addr` until interrupted.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), KvError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KvError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("kvreg HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KvError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// =============================================================================
// TESTS
// =============================================================================
