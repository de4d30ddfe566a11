//! Feedback guard endpoints called by the feedback widget before it submits.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use taskdeck_core::AppError;
use tracing::debug;

use crate::dto::{FeedbackGuardRequest, FeedbackGuardResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[cfg(test)]
mod tests;

/// Message returned when the request carries no usable user id.
pub const MISSING_USER_ID_MESSAGE: &str = "Thiếu userId.";

/// Counts one feedback action and rejects it while the user is throttled
/// or suspended.
pub async fn check_feedback_rate_limit_handler(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackGuardRequest>, JsonRejection>,
) -> ApiResult<Json<FeedbackGuardResponse>> {
    let user_id = required_user_id(payload)?;
    state
        .feedback_guard_service
        .check_and_record_action(user_id.as_str())
        .await?;

    Ok(Json(FeedbackGuardResponse { ok: true }))
}

/// Rejects suspended users without counting an action.
pub async fn check_feedback_suspension_handler(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackGuardRequest>, JsonRejection>,
) -> ApiResult<Json<FeedbackGuardResponse>> {
    let user_id = required_user_id(payload)?;
    state
        .feedback_guard_service
        .ensure_not_suspended(user_id.as_str())
        .await?;

    Ok(Json(FeedbackGuardResponse { ok: true }))
}

/// Unreadable bodies are reported the same way as a missing `userId`.
fn required_user_id(
    payload: Result<Json<FeedbackGuardRequest>, JsonRejection>,
) -> Result<String, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(
            status = %rejection.status(),
            error = %rejection.body_text(),
            "rejected feedback guard body"
        );
        AppError::Validation(MISSING_USER_ID_MESSAGE.to_owned())
    })?;

    payload
        .user_id
        .map(|user_id| user_id.trim().to_owned())
        .filter(|user_id| !user_id.is_empty())
        .ok_or_else(|| AppError::Validation(MISSING_USER_ID_MESSAGE.to_owned()))
}
