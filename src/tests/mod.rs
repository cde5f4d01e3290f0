
use std::sync::Arc;

use crate::telemetry::refresh::{RefreshTelemetry, RefreshTrigger};
use crate::{MemoryCredentialStore, RefreshHandlers, RefreshScheduler};

use test_support::{FixedBackend, capture_logs, pair_expiring_in};

#[test]
fn telemetry_preserves_trigger_and_id() {
    let telemetry = RefreshTelemetry::new(RefreshTrigger::Forced);
    assert_eq!(telemetry.trigger(), RefreshTrigger::Forced);
    assert_eq!(telemetry.trigger().to_string(), "scheduler.force");
    assert_eq!(telemetry.attempt_id(), telemetry.attempt_id());
    assert_ne!(
        telemetry.attempt_id(),
        RefreshTelemetry::new(RefreshTrigger::Forced).attempt_id()
    );
}

#[tokio::test]
async fn failed_exchange_logs_start_and_failure() {
    let store = Arc::new(MemoryCredentialStore::with_tokens(pair_expiring_in(10, 3600)));
    let scheduler = RefreshScheduler::builder(
        store,
        Arc::new(FixedBackend(Err("revoked".into()))),
    )
    .build();

    let (lines, guard) = capture_logs();
    scheduler.start(RefreshHandlers::new()).await;
    drop(guard);

    assert!(!scheduler.is_active());
    let logs = lines.lock().clone();
    assert!(
        logs.iter().any(|l| l.contains("INFO") && l.contains("refresh.start")),
        "expected refresh.start, got {:?}",
        logs
    );
    assert!(
        logs.iter()
            .any(|l| l.contains("ERROR") && l.contains("refresh.failure") && l.contains("revoked")),
        "expected refresh.failure, got {:?}",
        logs
    );
}

#[tokio::test]
async fn undecodable_token_warns_and_keeps_running() {
    let store = Arc::new(MemoryCredentialStore::with_tokens(pair_expiring_in(10, 3600)));
    let scheduler = RefreshScheduler::builder(
        store.clone(),
        Arc::new(FixedBackend(Ok(pair_expiring_in(900, 7200)))),
    )
    .build();

    let (lines, guard) = capture_logs();
    scheduler.start(RefreshHandlers::new()).await;
    drop(guard);

    assert!(scheduler.is_active());
    assert_eq!(
        store.snapshot().map(|p| p.access_token_expiry),
        scheduler.status().access_token_expiry
    );
    let logs = lines.lock().clone();
    assert!(
        logs.iter()
            .any(|l| l.contains("WARN") && l.contains("did not decode to a user")),
        "expected decode warning, got {:?}",
        logs
    );
    scheduler.stop();
}

#[tokio::test]
async fn manual_refresh_without_refresh_token_logs_skip() {
    let scheduler = RefreshScheduler::builder(
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(FixedBackend(Ok(pair_expiring_in(900, 7200)))),
    )
    .build();

    let (lines, guard) = capture_logs();
    let res = scheduler.try_manual_refresh().await;
    drop(guard);

    assert!(matches!(res, Err(crate::Error::NoSession)));
    let logs = lines.lock().clone();
    assert!(
        logs.iter().any(|l| l.contains("DEBUG")
            && l.contains("refresh.skipped")
            && l.contains("no refresh token")
            && l.contains("manual")),
        "expected refresh.skipped, got {:?}",
        logs
    );
    assert!(!logs.iter().any(|l| l.contains("refresh.start")));
}
