//! User identity and profile types.

use serde::{Deserialize, Serialize};
use taskdeck_core::{AppError, AppResult, NonEmptyString};

/// Suspension reason recorded when the feedback guard escalates a repeat
/// offender to a permanent block.
pub const FEEDBACK_SPAM_SUSPENSION_REASON: &str = "feedback.spam";

/// Identifier of a user account in the backend user directory.
///
/// Ids are opaque strings issued by the identity provider; the only rule
/// enforced here is that they are not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(NonEmptyString);

impl UserId {
    /// Creates a validated user identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        NonEmptyString::new(value.trim())
            .map(Self)
            .map_err(|_| AppError::Validation("user id must not be empty".to_owned()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Suspension-relevant slice of a user profile document.
///
/// Profiles carry many more attributes (display name, avatar, ...). Only the
/// two fields below are read or written by moderation code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSuspension {
    /// Timestamp string set when the account was suspended. Empty or absent
    /// means the account is active.
    pub suspended_until: Option<String>,
    /// Free-form tag describing why the account was suspended.
    pub suspension_reason: Option<String>,
}

impl ProfileSuspension {
    /// Builds the suspension written for feedback spam.
    ///
    /// `suspended_until` is the moment of suspension, not an unlock time.
    /// Nothing lifts it automatically.
    #[must_use]
    pub fn feedback_spam(suspended_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            suspended_until: Some(suspended_at.to_rfc3339()),
            suspension_reason: Some(FEEDBACK_SPAM_SUSPENSION_REASON.to_owned()),
        }
    }

    /// Returns whether the profile blocks every action.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended_until
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }
}
