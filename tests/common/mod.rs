#![allow(dead_code)]


use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::{EncodingKey, Header};
use parking_lot::Mutex;
use session_refresh::{
    AuthBackend, Clock, CredentialStore, Error, MemoryCredentialStore, RefreshEvent,
    RefreshHandlers, RefreshPolicy, RefreshScheduler, SchedulerFailure, TokenPair, UserIdentity,
};
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Registry, fmt};

pub use time::TestClock;

/// HS256 access token for `sub` expiring at `exp`.
pub fn access_jwt(sub: &str, exp: Timestamp) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &serde_json::json!({ "sub": sub, "email": format!("{sub}@example.com"), "exp": exp.as_second() }),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("sign test jwt")
}

pub fn pair_at(now: Timestamp, sub: &str, access_secs: i64, refresh_secs: i64) -> TokenPair {
    let access_expiry = now + SignedDuration::from_secs(access_secs);
    TokenPair::new(
        access_jwt(sub, access_expiry),
        access_expiry,
        format!("refresh-{sub}"),
        now + SignedDuration::from_secs(refresh_secs),
    )
}

/// Scripted answer for one backend call.
pub enum Scripted {
    Pair {
        sub: &'static str,
        access_secs: i64,
        refresh_secs: i64,
    },
    Opaque {
        access_secs: i64,
        refresh_secs: i64,
    },
    Fail(&'static str),
}

/// Backend replaying a script; an exhausted script fails.
pub struct FakeBackend {
    clock: TestClock,
    script: Mutex<VecDeque<Scripted>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen_refresh_tokens: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(clock: TestClock, script: Vec<Scripted>) -> Self {
        Self {
            clock,
            script: Mutex::new(script.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            seen_refresh_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.seen_refresh_tokens.lock().clone()
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_refresh_tokens.lock().push(refresh_token.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().pop_front();
        let now = self.clock.now();
        match next {
            Some(Scripted::Pair {
                sub,
                access_secs,
                refresh_secs,
            }) => Ok(pair_at(now, sub, access_secs, refresh_secs)),
            Some(Scripted::Opaque {
                access_secs,
                refresh_secs,
            }) => Ok(TokenPair::new(
                "opaque-access",
                now + SignedDuration::from_secs(access_secs),
                "opaque-refresh",
                now + SignedDuration::from_secs(refresh_secs),
            )),
            Some(Scripted::Fail(msg)) => Err(Error::Rejected(msg.to_string())),
            None => Err(Error::Rejected("script exhausted".into())),
        }
    }
}

/// Memory store counting how often the scheduler checks validity.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCredentialStore,
    validity_checks: AtomicUsize,
}

impl CountingStore {
    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            inner: MemoryCredentialStore::with_tokens(pair),
            validity_checks: AtomicUsize::new(0),
        }
    }

    pub fn validity_checks(&self) -> usize {
        self.validity_checks.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Option<TokenPair> {
        self.inner.snapshot()
    }
}

impl CredentialStore for CountingStore {
    fn access_token(&self) -> Option<String> {
        self.inner.access_token()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.refresh_token()
    }

    fn access_token_expiry(&self) -> Option<Timestamp> {
        self.inner.access_token_expiry()
    }

    fn refresh_token_expiry(&self) -> Option<Timestamp> {
        self.inner.refresh_token_expiry()
    }

    fn has_valid_tokens(&self) -> bool {
        self.validity_checks.fetch_add(1, Ordering::SeqCst);
        self.inner.has_valid_tokens()
    }

    fn is_refresh_token_expired(&self, now: Timestamp) -> bool {
        self.inner.is_refresh_token_expired(now)
    }

    fn set_tokens(&self, pair: TokenPair) {
        self.inner.set_tokens(pair)
    }

    fn clear_tokens(&self) {
        self.inner.clear_tokens()
    }
}

pub fn scheduler(
    clock: &TestClock,
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn AuthBackend>,
    policy: RefreshPolicy,
) -> RefreshScheduler {
    RefreshScheduler::builder(store, backend)
        .clock(Arc::new(clock.clone()))
        .policy(policy)
        .build()
}

/// Handlers recording every notification.
#[derive(Clone, Default)]
pub struct Recorder {
    pub successes: Arc<Mutex<Vec<UserIdentity>>>,
    pub failures: Arc<Mutex<Vec<SchedulerFailure>>>,
}

impl Recorder {
    pub fn handlers(&self) -> RefreshHandlers {
        let successes = self.successes.clone();
        let failures = self.failures.clone();
        RefreshHandlers::new()
            .on_success(move |user| successes.lock().push(user))
            .on_failure(move |failure| failures.lock().push(failure))
    }

    pub fn successes(&self) -> Vec<UserIdentity> {
        self.successes.lock().clone()
    }

    pub fn failures(&self) -> Vec<SchedulerFailure> {
        self.failures.lock().clone()
    }
}

pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<RefreshEvent>) -> Vec<RefreshEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.lines
            .lock()
            .push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let writer_lines = lines.clone();
    let subscriber = Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    );
    let guard = set_default(subscriber);
    (lines, guard)
}
