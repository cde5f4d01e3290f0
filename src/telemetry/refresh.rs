use std::fmt;

use jiff::{SignedDuration, Timestamp};
use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// What asked for a token exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    Tick,
    Forced,
    Manual,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tick => "scheduler.tick",
            Self::Forced => "scheduler.force",
            Self::Manual => "manual",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success,
    /// Tokens were stored but the new access token did not decode to a user.
    UserUndecodable,
}

/// Events for one exchange, correlated by `attempt_id`. Durations are
/// measured from the `refresh.start` instant.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    trigger: RefreshTrigger,
    started_at: Option<Timestamp>,
}

impl RefreshTelemetry {
    pub fn new(trigger: RefreshTrigger) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            trigger,
            started_at: None,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger
    }

    fn elapsed_ms(&self, at: Timestamp) -> i64 {
        self.started_at
            .map(|start| at.duration_since(start).as_millis() as i64)
            .unwrap_or(0)
    }

    /// `remaining` is the lifetime left on the access token being replaced.
    pub fn emit_start(&mut self, at: Timestamp, remaining: Option<SignedDuration>) {
        self.started_at = Some(at);
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            remaining_secs = remaining.map(|r| r.as_secs()),
            "refresh.start"
        );
    }

    pub fn emit_success(&self, outcome: RefreshOutcome, at: Timestamp, access_expiry: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            elapsed_ms = self.elapsed_ms(at),
            outcome = ?outcome,
            access_expiry = %access_expiry,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &Error, at: Timestamp) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            elapsed_ms = self.elapsed_ms(at),
            error = %error,
            "refresh.failure"
        );
    }

    pub fn emit_skipped(&self, reason: &str) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            reason,
            "refresh.skipped"
        );
    }
}
