use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::user::UserIdentity;

/// Why an active scheduler stopped itself.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerFailure {
    #[error("no valid session in the credential store")]
    NoValidSession,
    #[error("refresh token expired")]
    RefreshTokenExpired,
    #[error("refresh exchange failed: {0}")]
    RefreshExchangeFailed(String),
}

/// Notification delivered through [`RefreshHandlers::channel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshEvent {
    Refreshed(UserIdentity),
    Failed(SchedulerFailure),
}

type SuccessFn = Arc<dyn Fn(UserIdentity) + Send + Sync>;
type FailureFn = Arc<dyn Fn(SchedulerFailure) + Send + Sync>;

/// Success/failure handlers registered at `start` and dropped at `stop`.
///
/// Handlers run after the scheduler's internal lock is released, so they may
/// call back into the scheduler.
#[derive(Clone, Default)]
pub struct RefreshHandlers {
    on_success: Option<SuccessFn>,
    on_failure: Option<FailureFn>,
}

impl RefreshHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl Fn(UserIdentity) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl Fn(SchedulerFailure) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(f));
        self
    }

    /// Handlers that forward every notification into an unbounded channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RefreshEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let failure_tx = tx.clone();
        let handlers = Self::new()
            .on_success(move |user| {
                let _ = tx.send(RefreshEvent::Refreshed(user));
            })
            .on_failure(move |failure| {
                let _ = failure_tx.send(RefreshEvent::Failed(failure));
            });
        (handlers, rx)
    }

    pub(crate) fn refreshed(&self, user: UserIdentity) {
        if let Some(f) = &self.on_success {
            f(user);
        }
    }

    pub(crate) fn failed(&self, failure: SchedulerFailure) {
        if let Some(f) = &self.on_failure {
            f(failure);
        }
    }
}

impl fmt::Debug for RefreshHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshHandlers")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}
