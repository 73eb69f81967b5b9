//! HTTP endpoint handlers.
//!
//! Use [`routes`] to create a router with all endpoints.

use axum::extract::Path;
use axum::{Json, Router, routing};

use crate::error::{ApiError, ApiResult};
use crate::primes::{self, PrimeCheck, PrimeRange};

/// The largest range `between` accepts.
pub const MAX_RANGE: u64 = 1_000_000;

/// The largest number that is checked by trial division.
pub const MAX_NUMBER: i64 = 100_000_000;

/// Creates a router with all endpoints.
pub fn routes() -> Router {
    let prime_routes = Router::new()
        .route("/check/{i}", routing::get(check))
        .route("/between/{from}/{to}", routing::get(between));

    Router::new()
        .route("/health", routing::get(health))
        .nest("/api/prime", prime_routes)
}

async fn health() -> &'static str {
    "OK"
}

async fn check(Path(i): Path<i64>) -> ApiResult<Json<PrimeCheck>> {
    if i > MAX_NUMBER {
        return Err(ApiError::NumberTooLarge(i));
    }

    let result = tokio::task::spawn_blocking(move || primes::check(i)).await?;
    Ok(Json(result))
}

async fn between(Path((from, to)): Path<(i64, i64)>) -> ApiResult<Json<PrimeRange>> {
    // Only the numbers below `to` are checked, and an inverted range checks none.
    if to > MAX_NUMBER && from < to {
        return Err(ApiError::NumberTooLarge(to));
    }

    let len = to.saturating_sub(from).max(0) as u64;
    if len > MAX_RANGE {
        return Err(ApiError::RangeTooLarge(len));
    }

    let result = tokio::task::spawn_blocking(move || primes::between(from, to)).await?;
    tracing::debug!(from, to, count = result.count, elapsed = ?result.elapsed, "listed primes");
    Ok(Json(result))
}
