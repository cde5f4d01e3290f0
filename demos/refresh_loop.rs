use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use session_refresh::{
    Config, HttpAuthBackend, MemoryCredentialStore, RefreshHandlers, RefreshScheduler, TokenPair,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: enable basic logging for the example
    let _ = tracing_subscriber::fmt().try_init();

    // Load configuration from a JSON file placed next to the binary
    let cfg = Config::from_file("config.json")?;
    let backend = HttpAuthBackend::from_config(&cfg)?;

    // Seed the store with a session obtained at login
    let refresh_token = std::env::var("DEMO_REFRESH_TOKEN")?;
    let now = Timestamp::now();
    let store = Arc::new(MemoryCredentialStore::with_tokens(TokenPair::new(
        std::env::var("DEMO_ACCESS_TOKEN").unwrap_or_default(),
        now + SignedDuration::from_secs(30),
        refresh_token,
        now + SignedDuration::from_hours(24),
    )));

    let scheduler = RefreshScheduler::builder(store, Arc::new(backend))
        .policy(cfg.policy()?)
        .build();

    let handlers = RefreshHandlers::new()
        .on_success(|user| println!("refreshed session for {}", user.id))
        .on_failure(|failure| eprintln!("session lost: {failure}"));
    scheduler.start(handlers).await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    println!("{}", serde_json::to_string_pretty(&scheduler.status())?);
    scheduler.stop();
    Ok(())
}
