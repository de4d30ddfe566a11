use std::sync::Arc;

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, State};
use axum::http::header::{CONTENT_TYPE, RETRY_AFTER};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use taskdeck_application::{Collection, DocumentId, DocumentStore, FeedbackGuardService};
use taskdeck_domain::{FeedbackLimits, SUSPENDED_MESSAGE};
use taskdeck_infrastructure::InMemoryDocumentStore;

use super::{
    MISSING_USER_ID_MESSAGE, check_feedback_rate_limit_handler, check_feedback_suspension_handler,
};
use crate::dto::FeedbackGuardRequest;
use crate::state::AppState;

fn app_state(store: Arc<InMemoryDocumentStore>) -> AppState {
    AppState {
        feedback_guard_service: FeedbackGuardService::new(store, FeedbackLimits::default()),
    }
}

fn request(user_id: Option<&str>) -> Result<Json<FeedbackGuardRequest>, JsonRejection> {
    Ok(Json(FeedbackGuardRequest {
        user_id: user_id.map(str::to_owned),
    }))
}

async fn extract(
    content_type: Option<&str>,
    body: &str,
) -> Result<Json<FeedbackGuardRequest>, JsonRejection> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/feedback/rate-limit");
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    let request = builder
        .body(Body::from(body.to_owned()))
        .unwrap_or_else(|error| panic!("failed to build request: {error}"));

    Json::<FeedbackGuardRequest>::from_request(request, &()).await
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|error| panic!("failed to read body: {error}"));
    serde_json::from_slice(&bytes).unwrap_or_else(|error| panic!("body is not json: {error}"))
}

async fn suspend(store: &InMemoryDocumentStore, user_id: &str) {
    let Value::Object(fields) = json!({
        "suspendedUntil": "2025-01-01T00:00:00Z",
        "suspensionReason": "feedback.spam"
    }) else {
        panic!("profile fields must be an object");
    };
    let created = store
        .create_document(
            Collection::Profiles,
            DocumentId::Custom(user_id.to_owned()),
            fields,
            &[],
        )
        .await;
    assert!(created.is_ok());
}

#[tokio::test]
async fn allowed_action_returns_ok() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let response =
        check_feedback_rate_limit_handler(State(app_state(store.clone())), request(Some("user-1")))
            .await
            .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ok": true }));
    assert_eq!(store.count(Collection::Presence).await, 1);
}

#[tokio::test]
async fn missing_user_id_is_bad_request() {
    let store = Arc::new(InMemoryDocumentStore::new());

    for user_id in [None, Some("   ")] {
        let response =
            check_feedback_rate_limit_handler(State(app_state(store.clone())), request(user_id))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": MISSING_USER_ID_MESSAGE })
        );
    }

    assert_eq!(store.count(Collection::Presence).await, 0);
}

#[tokio::test]
async fn sixth_rapid_action_is_rate_limited_with_retry_after() {
    let state = app_state(Arc::new(InMemoryDocumentStore::new()));

    for _ in 0..5 {
        let response = check_feedback_rate_limit_handler(State(state.clone()), request(Some("u")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = check_feedback_rate_limit_handler(State(state), request(Some("u")))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    assert!(matches!(retry_after, Some(1..=10)));

    let body = body_json(response).await;
    let message = body.get("error").and_then(Value::as_str).unwrap_or_default();
    assert!(message.starts_with("Bạn đang gửi phản hồi quá nhanh."));
}

#[tokio::test]
async fn suspended_user_is_locked_on_both_endpoints() {
    let store = Arc::new(InMemoryDocumentStore::new());
    suspend(&store, "spammer").await;
    let state = app_state(store.clone());

    let rate_limit = check_feedback_rate_limit_handler(State(state.clone()), request(Some("spammer")))
        .await
        .into_response();
    let suspension = check_feedback_suspension_handler(State(state), request(Some("spammer")))
        .await
        .into_response();

    assert_eq!(rate_limit.status(), StatusCode::LOCKED);
    assert_eq!(suspension.status(), StatusCode::LOCKED);
    assert_eq!(
        body_json(suspension).await,
        json!({ "error": SUSPENDED_MESSAGE })
    );
    assert_eq!(store.count(Collection::Presence).await, 0);
}

#[tokio::test]
async fn suspension_check_does_not_count_actions() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let state = app_state(store.clone());

    for _ in 0..10 {
        let response = check_feedback_suspension_handler(State(state.clone()), request(Some("u")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(store.count(Collection::Presence).await, 0);
}

#[tokio::test]
async fn unreadable_bodies_get_the_missing_user_id_error() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let state = app_state(store.clone());

    let cases = [
        (Some("application/json"), r#"{"userId":123}"#),
        (Some("application/json"), "not json"),
        (None, r#"{"userId":"u"}"#),
    ];
    for (content_type, body) in cases {
        let payload = extract(content_type, body).await;
        assert!(payload.is_err(), "body {body:?} should be rejected");

        let response = check_feedback_rate_limit_handler(State(state.clone()), payload)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": MISSING_USER_ID_MESSAGE })
        );
    }

    let payload = extract(Some("application/json"), r#"{"userId":"u"}"#).await;
    let response = check_feedback_suspension_handler(State(state), payload)
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.count(Collection::Presence).await, 0);
}
