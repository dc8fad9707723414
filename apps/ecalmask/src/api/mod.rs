//! # ecalmask HTTP API Module
//!
//! Read-only HTTP service over the published mask snapshot, using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Bound epoch and table sizes
//! - `GET /mask/channel?module&ix&iy&bits&subdet` - Channel mask query
//! - `GET /mask/tower?module&ix&iy&bits&subdet` - Tower mask query
//! - `GET /scan?module&bits&subdet` - Masked positions of a module
//!
//! ## Configuration
//!
//! Browser origins come from `[server] cors_origins` in the config file.
//! With none configured, no cross-origin access is granted.

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `ecalmask::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    channel_handler, health_handler, scan_handler, status_handler, tower_handler,
};
#[allow(unused_imports)]
pub use types::{HealthResponse, MaskQuery, MaskResponse, ScanResponse, StatusResponse};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use ecalmask_core::{MaskError, MaskSnapshot, SharedMasks};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state holding the published masks.
#[derive(Clone)]
pub struct AppState {
    pub masks: Arc<SharedMasks>,
}

impl AppState {
    /// Create app state publishing `snapshot`.
    #[must_use]
    pub fn new(snapshot: MaskSnapshot) -> Self {
        Self {
            masks: Arc::new(SharedMasks::new(snapshot)),
        }
    }

    /// Create app state over existing shared masks.
    #[must_use]
    pub fn with_masks(masks: Arc<SharedMasks>) -> Self {
        Self { masks }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// CORS layer for the configured browser origins.
///
/// Only `GET` is allowed. `"*"` allows any origin; entries that are not valid
/// header values are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: allowing all origins");
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    tracing::debug!(origins = allowed.len(), "CORS origins configured");
    layer.allow_origin(allowed)
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, then CORS for `cors_origins`.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/mask/channel", get(handlers::channel_handler))
        .route("/mask/tower", get(handlers::tower_handler))
        .route("/scan", get(handlers::scan_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(
    addr: &str,
    state: AppState,
    cors_origins: &[String],
) -> Result<(), MaskError> {
    let router = create_router(state, cors_origins);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MaskError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("ecalmask HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| MaskError::IoError(format!("Server error: {}", e)))
}
