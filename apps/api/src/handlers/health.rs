use axum::Json;

use crate::dto::HealthResponse;

/// Liveness only; store reachability is surfaced by the feedback endpoints.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
