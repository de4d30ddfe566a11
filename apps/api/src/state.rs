use taskdeck_application::FeedbackGuardService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub feedback_guard_service: FeedbackGuardService,
}
