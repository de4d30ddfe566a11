use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for both feedback guard endpoints.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/feedback-guard-request.ts"
)]
pub struct FeedbackGuardRequest {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// Response returned when a feedback action is allowed.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/feedback-guard-response.ts"
)]
pub struct FeedbackGuardResponse {
    pub ok: bool,
}
