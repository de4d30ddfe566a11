//! Feedback abuse limiter: counting window, escalating cooldowns and the
//! suspension threshold.
//!
//! Everything in this module is pure. Callers load a [`FeedbackPresence`],
//! call [`FeedbackPresence::evaluate`] and persist the returned state.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use taskdeck_core::{AppError, AppResult};

/// Default width of the counting window.
pub const DEFAULT_FEEDBACK_WINDOW_MS: u64 = 10_000;
/// Default number of actions allowed inside one window.
pub const DEFAULT_FEEDBACK_MAX_ACTIONS: u32 = 5;
/// Default cooldown added per strike.
pub const DEFAULT_FEEDBACK_COOLDOWN_STEP_MS: u64 = 10_000;
/// Default quiet period after which strikes are forgiven.
pub const DEFAULT_FEEDBACK_STRIKE_RESET_MS: u64 = 20 * 60 * 1000;

/// Tunables for the feedback limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackLimits {
    window_ms: u64,
    max_actions: u32,
    cooldown_step_ms: u64,
    strike_reset_ms: u64,
}

impl FeedbackLimits {
    /// Creates validated limits. Every value must be greater than zero.
    pub fn new(
        window_ms: u64,
        max_actions: u32,
        cooldown_step_ms: u64,
        strike_reset_ms: u64,
    ) -> AppResult<Self> {
        for (name, value) in [
            ("window_ms", window_ms),
            ("max_actions", u64::from(max_actions)),
            ("cooldown_step_ms", cooldown_step_ms),
            ("strike_reset_ms", strike_reset_ms),
        ] {
            if value == 0 {
                return Err(AppError::Validation(format!(
                    "feedback limit {name} must be greater than zero"
                )));
            }
        }

        Ok(Self {
            window_ms,
            max_actions,
            cooldown_step_ms,
            strike_reset_ms,
        })
    }

    /// Returns the counting window width in milliseconds.
    #[must_use]
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Returns the number of actions allowed per window. It also caps the
    /// cooldown multiplier and is the strike count above which accounts are
    /// suspended.
    #[must_use]
    pub fn max_actions(&self) -> u32 {
        self.max_actions
    }

    /// Returns the cooldown added per strike in milliseconds.
    #[must_use]
    pub fn cooldown_step_ms(&self) -> u64 {
        self.cooldown_step_ms
    }

    /// Returns the strike forgiveness interval in milliseconds.
    #[must_use]
    pub fn strike_reset_ms(&self) -> u64 {
        self.strike_reset_ms
    }

    /// Cooldown applied after the given strike.
    #[must_use]
    pub fn cooldown_ms_for_strike(&self, strike_count: u32) -> u64 {
        u64::from(strike_count.min(self.max_actions)).saturating_mul(self.cooldown_step_ms)
    }
}

impl Default for FeedbackLimits {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_FEEDBACK_WINDOW_MS,
            max_actions: DEFAULT_FEEDBACK_MAX_ACTIONS,
            cooldown_step_ms: DEFAULT_FEEDBACK_COOLDOWN_STEP_MS,
            strike_reset_ms: DEFAULT_FEEDBACK_STRIKE_RESET_MS,
        }
    }
}

/// Per-user limiter state as stored on the presence document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackPresence {
    /// Start of the current counting window.
    pub feedback_window_start: Option<DateTime<Utc>>,
    /// Actions counted inside the current window.
    #[serde(deserialize_with = "null_as_zero")]
    pub feedback_window_count: u32,
    /// Violations since the last strike reset.
    #[serde(deserialize_with = "null_as_zero")]
    pub feedback_strike_count: u32,
    /// Actions are rejected until this instant.
    pub feedback_cooldown_until: Option<DateTime<Utc>>,
    /// Time of the most recent violation.
    pub feedback_last_violation_at: Option<DateTime<Utc>>,
    /// Time of the most recent checked action.
    pub last_feedback_action_at: Option<DateTime<Utc>>,
}

/// Outcome of evaluating one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackVerdict {
    /// The action fits inside the window.
    Allowed,
    /// A previous violation's cooldown is still running.
    CoolingDown {
        /// Whole seconds until the cooldown ends, rounded up.
        retry_after_seconds: u64,
    },
    /// The action overflowed the window and earned a strike.
    Violation {
        /// Strike count after this violation.
        strike_count: u32,
        /// Length of the newly started cooldown.
        cooldown_ms: u64,
        /// Whole seconds until the cooldown ends, rounded up.
        retry_after_seconds: u64,
        /// The strike count crossed the suspension threshold.
        suspend: bool,
    },
}

/// Next presence state plus the verdict for the evaluated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDecision {
    /// State to persist, whatever the verdict.
    pub presence: FeedbackPresence,
    /// What happened to the action.
    pub verdict: FeedbackVerdict,
}

impl FeedbackPresence {
    /// Returns whether a cooldown is active at `now`.
    #[must_use]
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.feedback_cooldown_until
            .is_some_and(|cooldown_until| cooldown_until > now)
    }

    /// Evaluates one action at `now` and returns the next state.
    ///
    /// Order of checks: strike decay, running cooldown, window counting,
    /// window overflow. A running cooldown short-circuits before the window
    /// is touched.
    #[must_use]
    pub fn evaluate(&self, now: DateTime<Utc>, limits: &FeedbackLimits) -> FeedbackDecision {
        let mut next = self.clone();
        next.last_feedback_action_at = Some(now);

        if next.feedback_strike_count > 0 {
            let forgiven = next.feedback_last_violation_at.is_none_or(|violated_at| {
                elapsed_ms(now, violated_at) >= clamp_to_i64(limits.strike_reset_ms)
            });
            if forgiven {
                next.feedback_strike_count = 0;
                next.feedback_last_violation_at = None;
            }
        }

        if let Some(cooldown_until) = next.feedback_cooldown_until.filter(|until| *until > now) {
            next.clear_window();
            let remaining_ms = u64::try_from(elapsed_ms(cooldown_until, now)).unwrap_or(0);
            return FeedbackDecision {
                presence: next,
                verdict: FeedbackVerdict::CoolingDown {
                    retry_after_seconds: ceil_seconds(remaining_ms),
                },
            };
        }

        let window_open = next
            .feedback_window_start
            .is_some_and(|start| elapsed_ms(now, start) <= clamp_to_i64(limits.window_ms));
        if window_open {
            next.feedback_window_count = next.feedback_window_count.saturating_add(1);
        } else {
            next.feedback_window_start = Some(now);
            next.feedback_window_count = 1;
        }

        if next.feedback_window_count <= limits.max_actions {
            return FeedbackDecision {
                presence: next,
                verdict: FeedbackVerdict::Allowed,
            };
        }

        let strike_count = next.feedback_strike_count.saturating_add(1);
        let cooldown_ms = limits.cooldown_ms_for_strike(strike_count);
        next.clear_window();
        next.feedback_strike_count = strike_count;
        next.feedback_cooldown_until = Some(add_ms(now, cooldown_ms));
        next.feedback_last_violation_at = Some(now);

        FeedbackDecision {
            presence: next,
            verdict: FeedbackVerdict::Violation {
                strike_count,
                cooldown_ms,
                retry_after_seconds: ceil_seconds(cooldown_ms),
                suspend: strike_count > limits.max_actions,
            },
        }
    }

    fn clear_window(&mut self) {
        self.feedback_window_start = None;
        self.feedback_window_count = 0;
    }
}

/// Stores leave unset integer attributes as `null`.
fn null_as_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u32>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn elapsed_ms(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    later.signed_duration_since(earlier).num_milliseconds()
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn ceil_seconds(milliseconds: u64) -> u64 {
    milliseconds.div_ceil(1000)
}

fn add_ms(instant: DateTime<Utc>, milliseconds: u64) -> DateTime<Utc> {
    TimeDelta::try_milliseconds(clamp_to_i64(milliseconds))
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
