//! Feedback abuse guard.
//!
//! Counts feedback actions per user in a fixed window, hands out escalating
//! cooldowns on overflow and permanently suspends repeat offenders. State is
//! kept on the user's presence and profile documents in the external store.
//!
//! Reads and writes are not transactional. Two concurrent requests for the
//! same user can both read the same window count and both write it back
//! incremented once, so the limit is a soft one under concurrency.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use taskdeck_core::{AppError, AppResult};
use taskdeck_domain::{
    FEEDBACK_SPAM_SUSPENSION_REASON, FeedbackLimits, FeedbackPresence, FeedbackVerdict,
    NotificationDraft, ProfileSuspension, SUSPENDED_MESSAGE, UserId, rate_limited_message,
};

use crate::{Collection, DocumentFields, DocumentId, DocumentPermission, DocumentStore};

mod documents;


use documents::{decode_document, encode_fields, notification_fields};

/// Application service guarding the feedback widget.
#[derive(Clone)]
pub struct FeedbackGuardService {
    store: Arc<dyn DocumentStore>,
    limits: FeedbackLimits,
}

impl FeedbackGuardService {
    /// Creates a guard over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, limits: FeedbackLimits) -> Self {
        Self { store, limits }
    }

    /// Checks whether `user_id` may perform a feedback action now and
    /// records the attempt.
    ///
    /// Fails with `AppError::Validation` for a blank id,
    /// `AppError::Suspended` for suspended accounts,
    /// `AppError::RateLimited` while throttled and `AppError::Internal` when
    /// the store misbehaves.
    pub async fn check_and_record_action(&self, user_id: &str) -> AppResult<()> {
        self.check_and_record_action_at(user_id, Utc::now()).await
    }

    /// Same as [`Self::check_and_record_action`] with an explicit clock.
    pub async fn check_and_record_action_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let user_id = UserId::new(user_id)?;

        if self.load_suspension(&user_id).await?.is_suspended() {
            return Err(AppError::Suspended(SUSPENDED_MESSAGE.to_owned()));
        }

        let presence = self
            .store
            .get_document(Collection::Presence, user_id.as_str())
            .await
            .map_err(store_failure)?
            .map(|document| decode_document::<FeedbackPresence>(Collection::Presence, &document))
            .transpose()?
            .unwrap_or_default();

        let decision = presence.evaluate(now, &self.limits);
        self.upsert_owned(
            Collection::Presence,
            &user_id,
            encode_fields(&decision.presence)?,
        )
        .await?;

        match decision.verdict {
            FeedbackVerdict::Allowed => Ok(()),
            FeedbackVerdict::CoolingDown {
                retry_after_seconds,
            } => {
                info!(
                    user_id = %user_id,
                    retry_after_seconds,
                    "feedback action rejected during cooldown"
                );
                self.notify(
                    NotificationDraft::feedback_rate_limited(
                        user_id,
                        retry_after_seconds,
                        decision.presence.feedback_strike_count,
                    ),
                    now,
                )
                .await;
                Err(rate_limited(retry_after_seconds))
            }
            FeedbackVerdict::Violation {
                strike_count,
                cooldown_ms,
                retry_after_seconds,
                suspend,
            } => {
                if suspend {
                    self.suspend_for_spam(user_id, strike_count, now).await?;
                    return Err(AppError::Suspended(SUSPENDED_MESSAGE.to_owned()));
                }

                info!(
                    user_id = %user_id,
                    strike_count,
                    cooldown_ms,
                    "feedback window exceeded"
                );
                self.notify(
                    NotificationDraft::feedback_rate_limited(
                        user_id,
                        retry_after_seconds,
                        strike_count,
                    ),
                    now,
                )
                .await;
                Err(rate_limited(retry_after_seconds))
            }
        }
    }

    /// Fails with `AppError::Suspended` if the account is suspended.
    ///
    /// Only the profile is read. A user without a profile is allowed, and
    /// the rate limit window is neither consulted nor updated.
    pub async fn ensure_not_suspended(&self, user_id: &str) -> AppResult<()> {
        let user_id = UserId::new(user_id)?;

        if self.load_suspension(&user_id).await?.is_suspended() {
            return Err(AppError::Suspended(SUSPENDED_MESSAGE.to_owned()));
        }

        Ok(())
    }

    async fn load_suspension(&self, user_id: &UserId) -> AppResult<ProfileSuspension> {
        let profile = self
            .store
            .get_document(Collection::Profiles, user_id.as_str())
            .await
            .map_err(store_failure)?;

        match profile {
            Some(document) => decode_document(Collection::Profiles, &document),
            None => Ok(ProfileSuspension::default()),
        }
    }

    async fn suspend_for_spam(
        &self,
        user_id: UserId,
        strike_count: u32,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.upsert_owned(
            Collection::Profiles,
            &user_id,
            encode_fields(&ProfileSuspension::feedback_spam(now))?,
        )
        .await?;

        warn!(
            user_id = %user_id,
            strike_count,
            reason = FEEDBACK_SPAM_SUSPENSION_REASON,
            "account suspended for feedback spam"
        );
        self.notify(
            NotificationDraft::account_suspended(
                user_id,
                FEEDBACK_SPAM_SUSPENSION_REASON,
                strike_count,
            ),
            now,
        )
        .await;

        Ok(())
    }

    /// Updates the user's document in `collection`, creating it when absent.
    async fn upsert_owned(
        &self,
        collection: Collection,
        user_id: &UserId,
        fields: DocumentFields,
    ) -> AppResult<()> {
        match self
            .store
            .update_document(collection, user_id.as_str(), fields.clone())
            .await
        {
            Ok(_) => return Ok(()),
            Err(AppError::NotFound(_)) => {}
            Err(error) => return Err(store_failure(error)),
        }

        let created = self
            .store
            .create_document(
                collection,
                DocumentId::Custom(user_id.as_str().to_owned()),
                fields.clone(),
                &[DocumentPermission::read_user(user_id.as_str())],
            )
            .await;

        match created {
            Ok(_) => Ok(()),
            // Lost a creation race with a concurrent request; the document exists now.
            Err(AppError::Conflict(_)) => self
                .store
                .update_document(collection, user_id.as_str(), fields)
                .await
                .map(|_| ())
                .map_err(store_failure),
            Err(error) => Err(store_failure(error)),
        }
    }

    /// Writes a notification. Failures are logged and swallowed.
    async fn notify(&self, draft: NotificationDraft, now: DateTime<Utc>) {
        let permissions = [DocumentPermission::read_user(draft.recipient_id().as_str())];
        let result = self
            .store
            .create_document(
                Collection::Notifications,
                DocumentId::Generated,
                notification_fields(&draft, now),
                &permissions,
            )
            .await;

        if let Err(error) = result {
            warn!(
                error = %error,
                user_id = %draft.recipient_id(),
                notification_type = draft.notification_type().as_str(),
                "failed to create moderation notification"
            );
        }
    }
}

fn rate_limited(retry_after_seconds: u64) -> AppError {
    AppError::RateLimited {
        message: rate_limited_message(retry_after_seconds),
        retry_after_seconds,
    }
}

/// Collapses store errors into `Internal` so callers only ever see the
/// guard's own outcomes.
fn store_failure(error: AppError) -> AppError {
    match error {
        AppError::Internal(message) => AppError::Internal(message),
        other => AppError::Internal(format!("document store failure: {other}")),
    }
}
