use axum::Router;
use axum::routing::{get, post};
use taskdeck_core::AppError;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

mod cors;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let feedback_routes = Router::new()
        .route(
            "/api/feedback/rate-limit",
            post(handlers::feedback::check_feedback_rate_limit_handler),
        )
        .route(
            "/api/feedback/suspension",
            post(handlers::feedback::check_feedback_suspension_handler),
        );

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(feedback_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
