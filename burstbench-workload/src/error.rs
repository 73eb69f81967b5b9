//! Error responses of the workload API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Error type for workload requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested range exceeds [`MAX_RANGE`](crate::endpoints::MAX_RANGE).
    #[error("range of {0} numbers is too large")]
    RangeTooLarge(u64),

    /// A number exceeds [`MAX_NUMBER`](crate::endpoints::MAX_NUMBER).
    #[error("number {0} is too large")]
    NumberTooLarge(i64),

    /// The blocking computation did not complete.
    #[error("workload task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for workload requests.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::RangeTooLarge(_) | ApiError::NumberTooLarge(_) => {
                tracing::debug!("bad request: {self}");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            ApiError::Task(err) => {
                tracing::error!(error = err as &dyn std::error::Error, "workload task failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
