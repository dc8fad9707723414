//! # API Endpoint Handlers
//!
//! This module implements the HTTP endpoint handlers. All of them read the
//! snapshot currently published in [`AppState`].

use super::{
    AppState,
    types::{HealthResponse, MaskQuery, MaskResponse, ScanResponse, StatusResponse},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use ecalmask_core::MaskError;

/// HTTP status for a failed query.
fn error_status(error: &MaskError) -> StatusCode {
    match error {
        MaskError::InvalidSubdetector(_)
        | MaskError::UnknownSubdetectorTag(_)
        | MaskError::InvalidDetId(_)
        | MaskError::ConfigError(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Describe the bound conditions.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.masks.current();
    (StatusCode::OK, Json(StatusResponse::from_snapshot(&snapshot)))
}

// =============================================================================
// MASK HANDLERS
// =============================================================================

/// Channel mask query.
pub async fn channel_handler(
    State(state): State<AppState>,
    Query(query): Query<MaskQuery>,
) -> impl IntoResponse {
    let result = query.parse().and_then(|(subdet, bits)| {
        state
            .masks
            .mask_channel(query.module, query.ix, query.iy, bits, subdet)
    });
    match result {
        Ok(masked) => (StatusCode::OK, Json(MaskResponse::masked(masked))),
        Err(e) => (error_status(&e), Json(MaskResponse::error(e.to_string()))),
    }
}

/// Tower mask query.
pub async fn tower_handler(
    State(state): State<AppState>,
    Query(query): Query<MaskQuery>,
) -> impl IntoResponse {
    let result = query.parse().and_then(|(subdet, bits)| {
        state
            .masks
            .mask_tower(query.module, query.ix, query.iy, bits, subdet)
    });
    match result {
        Ok(masked) => (StatusCode::OK, Json(MaskResponse::masked(masked))),
        Err(e) => (error_status(&e), Json(MaskResponse::error(e.to_string()))),
    }
}

// =============================================================================
// SCAN HANDLER
// =============================================================================

/// Masked positions of one module.
pub async fn scan_handler(
    State(state): State<AppState>,
    Query(query): Query<MaskQuery>,
) -> impl IntoResponse {
    let snapshot = state.masks.current();
    let result = query
        .parse()
        .and_then(|(subdet, bits)| snapshot.scan_module(query.module, bits, subdet));
    match result {
        Ok(scan) => (StatusCode::OK, Json(ScanResponse::success(scan))),
        Err(e) => (error_status(&e), Json(ScanResponse::error(e.to_string()))),
    }
}
