//! # Submission Authorization
//!
//! Bearer key check in front of `POST /submit`, the only route that can
//! change the registry. Lookups, validation and exports stay open.
//!
//! ```text
//! Authorization: Bearer <submit-key>
//! ```

use super::types::SubmitResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// The key a submitter must present.
#[derive(Clone)]
pub struct SubmitKey(Arc<str>);

impl SubmitKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    /// Constant-time comparison over the longer of the two keys.
    fn accepts(&self, provided: &[u8]) -> bool {
        let expected = self.0.as_bytes();
        let max_len = provided.len().max(expected.len());
        let mut padded_provided = vec![0u8; max_len];
        let mut padded_expected = vec![0u8; max_len];
        padded_provided[..provided.len()].copy_from_slice(provided);
        padded_expected[..expected.len()].copy_from_slice(expected);

        let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
        bytes_match && provided.len() == expected.len()
    }
}

/// Reject a submission without a matching bearer key before it reaches
/// validation, so an unauthorized batch never takes the registry write lock.
pub async fn require_submit_key(
    State(key): State<SubmitKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<SubmitResponse>)> {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if key.accepts(token.as_bytes()) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(event = "submit_unauthorized", reason = "invalid_key");
            Err(unauthorized())
        }
        None => {
            tracing::warn!(event = "submit_unauthorized", reason = "missing_bearer");
            Err(unauthorized())
        }
    }
}

fn unauthorized() -> (StatusCode, Json<SubmitResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(SubmitResponse::error("Submission requires a valid bearer key")),
    )
}
