//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod feedback;
mod notification;
mod user;

pub use feedback::{
    DEFAULT_FEEDBACK_COOLDOWN_STEP_MS, DEFAULT_FEEDBACK_MAX_ACTIONS, DEFAULT_FEEDBACK_STRIKE_RESET_MS,
    DEFAULT_FEEDBACK_WINDOW_MS, FeedbackDecision, FeedbackLimits, FeedbackPresence,
    FeedbackVerdict,
};
pub use notification::{
    NOTIFICATION_METADATA_MAX_BYTES, NotificationDraft, NotificationType, SUSPENDED_MESSAGE,
    rate_limited_message, truncate_utf8,
};
pub use user::{FEEDBACK_SPAM_SUSPENSION_REASON, ProfileSuspension, UserId};
