//! # Submission Rate Limit
//!
//! One budget shared by every submitter. A batch can hold many entries, so
//! the budget counts batches per minute rather than requests per second.

use super::types::SubmitResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Batches accepted per minute when nothing is configured.
pub const DEFAULT_SUBMISSIONS_PER_MINUTE: u32 = 60;

pub type SubmissionLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// `None` when `per_minute` is zero (limit disabled).
pub fn submission_limiter(per_minute: u32) -> Option<SubmissionLimiter> {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute)?);
    Some(Arc::new(RateLimiter::direct(quota)))
}

/// Returns 429 with a submit-shaped error once the budget is spent.
pub async fn limit_submissions(
    State(limiter): State<SubmissionLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<SubmitResponse>)> {
    match limiter.check() {
        Ok(()) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(event = "submit_throttled", "Submission rate limit exceeded");
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(SubmitResponse::error(
                    "Submission rate limit exceeded, retry later",
                )),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables() {
        assert!(submission_limiter(0).is_none());
    }

    #[test]
    fn burst_is_the_per_minute_budget() {
        let Some(limiter) = submission_limiter(2) else {
            panic!("limit of 2 must build a limiter");
        };
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
