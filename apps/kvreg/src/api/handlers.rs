//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        BatchQuery, EntryResponse, ExportResponse, HashResponse, HealthResponse, LookupQuery,
        StatusResponse, SubmitResponse,
    },
};
use crate::store::{save_session, today};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use kvreg_core::{Codepoint, SubmissionContext, SubmitOutcome};

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

/// Get registry status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.statistics() {
        Ok(statistics) => Json(StatusResponse {
            registry: session.source().clone(),
            statistics,
            min_codepoint: session.engine().min_codepoint().value(),
            persistent: session.is_persistent(),
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Status failed: {}", e),
        )
            .into_response(),
    }
}

// =============================================================================
// ENTRY HANDLERS
// =============================================================================

/// Fetch one entry by codepoint.
pub async fn entry_handler(
    State(state): State<AppState>,
    Path(codepoint): Path<u64>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.lookup_codepoint(Codepoint(codepoint)) {
        Ok(Some(entry)) => (StatusCode::OK, Json(EntryResponse::from_lookup(Some(entry)))),
        Ok(None) => (StatusCode::NOT_FOUND, Json(EntryResponse::from_lookup(None))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(EntryResponse::error(format!("Lookup failed: {}", e))),
        ),
    }
}

/// Fetch one entry by canonical name or URI.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    let result = match (query.name.as_deref(), query.uri.as_deref()) {
        (Some(name), None) => session.lookup_name(name),
        (None, Some(uri)) => session.lookup_uri(uri),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(EntryResponse::error("Give exactly one of 'name' or 'uri'")),
            );
        }
    };

    match result {
        Ok(Some(entry)) => (StatusCode::OK, Json(EntryResponse::from_lookup(Some(entry)))),
        Ok(None) => (StatusCode::NOT_FOUND, Json(EntryResponse::from_lookup(None))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(EntryResponse::error(format!("Lookup failed: {}", e))),
        ),
    }
}

// =============================================================================
// VALIDATE / SUBMIT HANDLERS
// =============================================================================

/// Validate a request document without committing it.
///
/// The body is taken as raw bytes so malformed JSON is reported as V-001
/// rather than rejected by the extractor.
pub async fn validate_handler(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
    body: Bytes,
) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.validate(query.batch_ref(), &body) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Validation failed: {}", e),
        )
            .into_response(),
    }
}

/// Validate and commit a request document as one unit.
///
/// The write lock is held across validation, commit and save, so no other
/// submission can slip in between. A JSON registry that cannot be written
/// back is rolled back to its state before the batch.
pub async fn submit_handler(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
    body: Bytes,
) -> impl IntoResponse {
    let mut ctx = SubmissionContext::new(today());
    if let Some(pr) = query.pr {
        ctx = ctx.with_pr(pr);
    }

    let mut session = state.session.write().await;
    let checkpoint = state
        .registry_path
        .as_ref()
        .and_then(|_| session.checkpoint());
    let outcome = match session.submit(query.batch_ref(), &body, &ctx) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Submit failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SubmitResponse::error(format!("Submit failed: {}", e))),
            );
        }
    };

    match outcome {
        SubmitOutcome::Committed(count) => {
            if let Some(path) = &state.registry_path
                && let Err(e) = save_session(&session, path)
            {
                tracing::error!("Committed batch could not be saved, rolling back: {}", e);
                if let Some(previous) = checkpoint {
                    session.rollback(previous);
                }
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(SubmitResponse::error(format!("Save failed: {}", e))),
                );
            }
            tracing::info!(
                batch = query.batch_ref(),
                committed = count,
                "Batch committed"
            );
            (StatusCode::OK, Json(SubmitResponse::committed(count)))
        }
        SubmitOutcome::Rejected(report) => {
            tracing::info!(
                batch = query.batch_ref(),
                violations = report.len(),
                "Batch rejected"
            );
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(SubmitResponse::rejected(report)),
            )
        }
    }
}

// =============================================================================
// EXPORT / HASH HANDLERS
// =============================================================================

/// Export the registry in canonical format.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    let checksum = match session.canonical_checksum() {
        Ok(c) => c,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResponse::error(format!("Checksum failed: {}", e))),
            );
        }
    };

    match session.export_canonical() {
        Ok(data) => (StatusCode::OK, Json(ExportResponse::success(data, checksum))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        ),
    }
}

/// Canonical checksum and BLAKE3 digest of the registry.
pub async fn hash_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let result = session.canonical_checksum().and_then(|checksum| {
        let blake3 = session.canonical_crypto_hash()?;
        let entries = session.store().entry_count()?;
        Ok(HashResponse {
            checksum,
            blake3,
            entries,
        })
    });

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Hash failed: {}", e),
        )
            .into_response(),
    }
}
