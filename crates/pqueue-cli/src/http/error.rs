//! Mapping from queue errors to HTTP responses.
//!
//! Status codes are decided here and nowhere else.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pqueue_core::QueueError;

use crate::wire::ErrorBody;

#[derive(Debug)]
pub enum ApiError {
    Queue(QueueError),
    InvalidParameters(String),
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        Self::Queue(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Queue(QueueError::CapacityExceeded { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "MAX_CAPACITY_REACHED")
            }
            ApiError::Queue(QueueError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Queue(QueueError::Empty) => (StatusCode::NOT_FOUND, "QUEUE_EMPTY"),
            ApiError::Queue(QueueError::ReservedPriority(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PRIORITY")
            }
            ApiError::Queue(QueueError::Heap(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::InvalidParameters(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMETERS"),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Queue(err) => err.to_string(),
            ApiError::InvalidParameters(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let body = ErrorBody {
            error: code,
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
