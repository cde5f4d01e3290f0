//! Proactive token refresh.
//!
//! A [`RefreshScheduler`] polls the credential store on an adaptive interval
//! and exchanges the refresh token shortly before the access token lapses.
//! After every successful exchange the timer is cancelled and re-armed with an
//! interval derived from the new expiry; any failure stops the scheduler and
//! notifies the registered failure handler.

use std::sync::{Arc, Weak};
use std::time::Duration;

use jiff::SignedDuration;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::AuthBackend;
use crate::clock::{Clock, SystemClock};
use crate::errors::Error;
use crate::telemetry::refresh::{RefreshOutcome, RefreshTelemetry, RefreshTrigger};
use crate::token::{CredentialStore, RefreshPolicy, TokenPair};
use crate::user::{JwtUserDecoder, UserDecoder};

mod handlers;
mod status;

pub use handlers::{RefreshEvent, RefreshHandlers, SchedulerFailure};
pub use status::SchedulerStatus;

#[derive(Default)]
struct SchedulerState {
    active: bool,
    /// Bumped on every arm and disarm; a timer only acts while it matches.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    handlers: Option<RefreshHandlers>,
    check_interval: Option<Duration>,
}

struct Inner {
    policy: RefreshPolicy,
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn AuthBackend>,
    decoder: Arc<dyn UserDecoder>,
    clock: Arc<dyn Clock>,
    state: Mutex<SchedulerState>,
    // Serializes refresh exchanges for this instance.
    in_flight: tokio::sync::Mutex<()>,
}

/// Owned handle to a refresh scheduler. Clones share the same instance.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

pub struct RefreshSchedulerBuilder {
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn AuthBackend>,
    decoder: Arc<dyn UserDecoder>,
    clock: Arc<dyn Clock>,
    policy: RefreshPolicy,
}

impl RefreshSchedulerBuilder {
    pub fn policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn UserDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> RefreshScheduler {
        RefreshScheduler {
            inner: Arc::new(Inner {
                policy: self.policy,
                store: self.store,
                backend: self.backend,
                decoder: self.decoder,
                clock: self.clock,
                state: Mutex::new(SchedulerState::default()),
                in_flight: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

impl RefreshScheduler {
    /// Starts a builder with the default policy, JWT user decoding and the
    /// system clock.
    pub fn builder(
        store: Arc<dyn CredentialStore>,
        backend: Arc<dyn AuthBackend>,
    ) -> RefreshSchedulerBuilder {
        RefreshSchedulerBuilder {
            store,
            backend,
            decoder: Arc::new(JwtUserDecoder),
            clock: Arc::new(SystemClock),
            policy: RefreshPolicy::default(),
        }
    }

    pub fn store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.inner.policy
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Activates the scheduler and runs one check pass before returning.
    ///
    /// Starting an active scheduler restarts it: the previous timer is
    /// cancelled and its handlers dropped before the new ones are installed.
    pub async fn start(&self, handlers: RefreshHandlers) {
        let interval = {
            let mut state = self.inner.state.lock();
            if state.active {
                debug!("scheduler already active; restarting");
                Inner::disarm(&mut state);
            }
            state.active = true;
            state.handlers = Some(handlers);
            let interval = self.inner.next_check_interval();
            self.inner.arm(&mut state, interval);
            interval
        };
        info!(
            interval_ms = interval.as_millis() as u64,
            "token refresh scheduler started"
        );
        self.inner.check_and_refresh().await;
    }

    /// Cancels the timer and drops the handlers. No-op when idle.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        if state.active {
            info!("token refresh scheduler stopped");
        }
        Inner::disarm(&mut state);
    }

    /// Runs one refresh attempt through the scheduled path, re-arming on
    /// success and stopping on failure. Idle schedulers return `false`
    /// without contacting the backend.
    pub async fn force_refresh(&self) -> bool {
        if !self.inner.is_active() {
            debug!("force refresh ignored; scheduler idle");
            return false;
        }
        let _guard = self.inner.in_flight.lock().await;
        if !self.inner.is_active() {
            return false;
        }
        self.inner.attempt_refresh(RefreshTrigger::Forced).await
    }

    /// Exchanges the stored refresh token regardless of scheduler state and
    /// stores the result. Leaves the timer and active flag untouched.
    pub async fn manual_refresh(&self) -> Option<TokenPair> {
        self.try_manual_refresh().await.ok()
    }

    /// [`manual_refresh`](Self::manual_refresh) with the failure reason.
    pub async fn try_manual_refresh(&self) -> Result<TokenPair, Error> {
        let _guard = self.inner.in_flight.lock().await;
        let mut telemetry = RefreshTelemetry::new(RefreshTrigger::Manual);
        let Some(refresh_token) = self.inner.store.refresh_token() else {
            telemetry.emit_skipped("no refresh token");
            return Err(Error::NoSession);
        };
        telemetry.emit_start(self.inner.clock.now(), self.inner.access_remaining());
        match self.inner.backend.refresh(&refresh_token).await {
            Ok(pair) => {
                self.inner.store.set_tokens(pair.clone());
                telemetry.emit_success(
                    RefreshOutcome::Success,
                    self.inner.clock.now(),
                    pair.access_token_expiry,
                );
                Ok(pair)
            }
            Err(err) => {
                telemetry.emit_failure(&err, self.inner.clock.now());
                Err(err)
            }
        }
    }

    /// Read-only snapshot; never arms or cancels timers.
    pub fn status(&self) -> SchedulerStatus {
        let (is_active, check_interval) = {
            let state = self.inner.state.lock();
            (state.active, state.check_interval)
        };
        let store = &self.inner.store;
        let access_token_expiry = store.access_token_expiry();
        let refresh_due = is_active && self.inner.policy.is_refresh_due(self.inner.access_remaining());
        SchedulerStatus {
            is_active,
            has_valid_tokens: store.has_valid_tokens(),
            access_token_expiry,
            refresh_token_expiry: store.refresh_token_expiry(),
            refresh_due,
            check_interval,
        }
    }
}

impl Inner {
    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn is_current(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.active && state.generation == generation
    }

    fn access_remaining(&self) -> Option<SignedDuration> {
        let now = self.clock.now();
        self.store
            .access_token_expiry()
            .map(|expiry| expiry.duration_since(now))
    }

    fn next_check_interval(&self) -> Duration {
        self.policy.check_interval(self.access_remaining())
    }

    /// Cancel-then-schedule. Callers hold the state lock, so no second timer
    /// can be armed in between.
    fn arm(self: &Arc<Self>, state: &mut SchedulerState, interval: Duration) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation = state.generation.wrapping_add(1);
        state.check_interval = Some(interval);
        let generation = state.generation;
        state.timer = Some(tokio::spawn(tick_loop(
            Arc::downgrade(self),
            generation,
            interval,
        )));
        debug!(
            generation,
            interval_ms = interval.as_millis() as u64,
            "refresh timer armed"
        );
    }

    fn disarm(state: &mut SchedulerState) -> Option<RefreshHandlers> {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation = state.generation.wrapping_add(1);
        state.active = false;
        state.check_interval = None;
        state.handlers.take()
    }

    /// Stops the scheduler and notifies the failure handler exactly once.
    fn fail(&self, failure: SchedulerFailure) {
        let handlers = {
            let mut state = self.state.lock();
            if !state.active {
                return;
            }
            Self::disarm(&mut state)
        };
        warn!(reason = %failure, "token refresh scheduler stopped after failure");
        if let Some(handlers) = handlers {
            handlers.failed(failure);
        }
    }

    async fn check_and_refresh(self: &Arc<Self>) {
        if !self.is_active() {
            return;
        }
        if !self.store.has_valid_tokens() {
            self.fail(SchedulerFailure::NoValidSession);
            return;
        }
        let now = self.clock.now();
        if self.store.is_refresh_token_expired(now) {
            self.fail(SchedulerFailure::RefreshTokenExpired);
            return;
        }
        let remaining = self.access_remaining();
        if !self.policy.is_refresh_due(remaining) {
            if let Some(remaining) = remaining {
                debug!(
                    remaining_secs = remaining.as_secs(),
                    "access token still fresh"
                );
            }
            return;
        }
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("refresh already in flight; skipping check");
            return;
        };
        // An exchange may have completed between the due check and the lock.
        if !self.is_active() || !self.policy.is_refresh_due(self.access_remaining()) {
            debug!("token refreshed concurrently; skipping check");
            return;
        }
        self.attempt_refresh(RefreshTrigger::Tick).await;
    }

    /// Caller holds `in_flight`.
    async fn attempt_refresh(self: &Arc<Self>, trigger: RefreshTrigger) -> bool {
        let mut telemetry = RefreshTelemetry::new(trigger);
        let Some(refresh_token) = self.store.refresh_token() else {
            telemetry.emit_skipped("no refresh token");
            self.fail(SchedulerFailure::NoValidSession);
            return false;
        };

        telemetry.emit_start(self.clock.now(), self.access_remaining());
        let pair = match self.backend.refresh(&refresh_token).await {
            Ok(pair) => pair,
            Err(err) => {
                telemetry.emit_failure(&err, self.clock.now());
                self.fail(SchedulerFailure::RefreshExchangeFailed(err.to_string()));
                return false;
            }
        };

        let access_expiry = pair.access_token_expiry;
        let user = self.decoder.decode_user(&pair.access_token);
        self.store.set_tokens(pair);
        let outcome = if user.is_some() {
            RefreshOutcome::Success
        } else {
            RefreshOutcome::UserUndecodable
        };
        telemetry.emit_success(outcome, self.clock.now(), access_expiry);

        let handlers = {
            let mut state = self.state.lock();
            if !state.active {
                debug!("scheduler stopped during refresh; not re-arming");
                return true;
            }
            let interval = self.next_check_interval();
            self.arm(&mut state, interval);
            state.handlers.clone()
        };
        match (user, handlers) {
            (Some(user), Some(handlers)) => handlers.refreshed(user),
            (None, _) => {
                warn!("refreshed access token did not decode to a user; success handler skipped")
            }
            (Some(_), None) => {}
        }
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

async fn tick_loop(inner: Weak<Inner>, generation: u64, interval: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(scheduler) = inner.upgrade() else {
            return;
        };
        if !scheduler.is_current(generation) {
            return;
        }
        // Stop and restart abort this task; the pass runs detached so an
        // exchange already in flight still completes and stores its pair.
        let pass = tokio::spawn(async move { scheduler.check_and_refresh().await });
        let _ = pass.await;
    }
}
