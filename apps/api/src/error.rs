use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use taskdeck_core::AppError;
use tracing::error;

mod types;

pub use types::ErrorResponse;

/// Message shown for any failure the caller cannot act on.
pub const INTERNAL_ERROR_MESSAGE: &str = "Đã xảy ra lỗi, vui lòng thử lại sau.";

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::Validation(message) => error_response(StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            AppError::Conflict(message) => error_response(StatusCode::CONFLICT, message),
            AppError::Suspended(message) => error_response(StatusCode::LOCKED, message),
            AppError::RateLimited {
                message,
                retry_after_seconds,
            } => {
                let mut response = error_response(StatusCode::TOO_MANY_REQUESTS, message);
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_seconds));
                response
            }
            AppError::Internal(detail) => {
                error!(error = %detail, "request failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_owned(),
                )
            }
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
