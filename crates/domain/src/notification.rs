//! In-app notifications emitted by moderation.

use serde_json::{Value, json};

use crate::UserId;

/// Upper bound for the serialized `metadata` attribute of a notification.
pub const NOTIFICATION_METADATA_MAX_BYTES: usize = 1000;

/// Kind tag stored on notification documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    /// The user hit the feedback limiter and must wait.
    FeedbackRateLimited,
    /// The account was suspended.
    AccountSuspended,
}

impl NotificationType {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FeedbackRateLimited => "feedback_rate_limited",
            Self::AccountSuspended => "account_suspended",
        }
    }
}

/// Notification ready to be written to the notifications collection.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    notification_type: NotificationType,
    recipient_id: UserId,
    message: String,
    metadata: Value,
}

impl NotificationDraft {
    /// Warning sent whenever a feedback action is rejected by the limiter.
    #[must_use]
    pub fn feedback_rate_limited(
        recipient_id: UserId,
        retry_after_seconds: u64,
        strike_count: u32,
    ) -> Self {
        Self {
            notification_type: NotificationType::FeedbackRateLimited,
            message: rate_limited_message(retry_after_seconds),
            metadata: json!({
                "retryAfterSeconds": retry_after_seconds,
                "strikeCount": strike_count,
            }),
            recipient_id,
        }
    }

    /// Notice sent when an account is suspended.
    #[must_use]
    pub fn account_suspended(recipient_id: UserId, reason: &str, strike_count: u32) -> Self {
        Self {
            notification_type: NotificationType::AccountSuspended,
            message: SUSPENDED_MESSAGE.to_owned(),
            metadata: json!({
                "reason": reason,
                "strikeCount": strike_count,
            }),
            recipient_id,
        }
    }

    /// Returns the notification kind.
    #[must_use]
    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    /// Returns the user the notification is addressed to.
    #[must_use]
    pub fn recipient_id(&self) -> &UserId {
        &self.recipient_id
    }

    /// Returns the user-facing text.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Serializes metadata and cuts it to [`NOTIFICATION_METADATA_MAX_BYTES`].
    #[must_use]
    pub fn metadata_string(&self) -> String {
        let encoded = self.metadata.to_string();
        truncate_utf8(encoded.as_str(), NOTIFICATION_METADATA_MAX_BYTES).to_owned()
    }
}

/// Message shown to suspended users.
pub const SUSPENDED_MESSAGE: &str =
    "Tài khoản của bạn đã bị khóa do gửi phản hồi quá nhiều. Vui lòng liên hệ quản trị viên.";

/// Message shown to rate-limited users.
#[must_use]
pub fn rate_limited_message(retry_after_seconds: u64) -> String {
    format!("Bạn đang gửi phản hồi quá nhanh. Vui lòng thử lại sau {retry_after_seconds} giây.")
}

/// Returns the longest prefix of `value` that fits in `max_bytes` without
/// splitting a character.
#[must_use]
pub fn truncate_utf8(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }

    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(draft: &NotificationDraft) -> Value {
        serde_json::from_str(draft.metadata_string().as_str())
            .unwrap_or_else(|error| panic!("metadata should be json: {error}"))
    }

    fn user() -> UserId {
        UserId::new("user-7").unwrap_or_else(|error| panic!("user id: {error}"))
    }

    #[test]
    fn rate_limited_message_mentions_seconds() {
        assert!(rate_limited_message(10).contains("10 giây"));
    }

    #[test]
    fn rate_limited_draft_carries_retry_metadata() {
        let draft = NotificationDraft::feedback_rate_limited(user(), 12, 2);

        assert_eq!(draft.notification_type().as_str(), "feedback_rate_limited");
        assert_eq!(draft.recipient_id().as_str(), "user-7");
        assert!(draft.message().contains("12 giây"));
        assert_eq!(metadata(&draft)["retryAfterSeconds"], 12);
        assert_eq!(metadata(&draft)["strikeCount"], 2);
    }

    #[test]
    fn suspended_draft_uses_suspended_message() {
        let draft = NotificationDraft::account_suspended(user(), "feedback.spam", 6);
        assert_eq!(draft.notification_type(), NotificationType::AccountSuspended);
        assert_eq!(draft.message(), SUSPENDED_MESSAGE);
        assert_eq!(metadata(&draft)["reason"], "feedback.spam");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let value = "ăăăă";
        assert_eq!(truncate_utf8(value, 3), "ă");
        assert_eq!(truncate_utf8(value, 100), value);
        assert_eq!(truncate_utf8(value, 0), "");
    }

    #[test]
    fn oversized_metadata_is_cut_to_budget() {
        let long_reason = "x".repeat(NOTIFICATION_METADATA_MAX_BYTES * 2);
        let draft = NotificationDraft::account_suspended(user(), long_reason.as_str(), 6);
        assert_eq!(
            draft.metadata_string().len(),
            NOTIFICATION_METADATA_MAX_BYTES
        );
    }
}
