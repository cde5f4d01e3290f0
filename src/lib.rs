//! Client-side session keeping: a self-adjusting scheduler that refreshes
//! access tokens before they lapse, plus on-demand and 401-triggered refresh.

pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod retry;
pub mod scheduler;
pub mod telemetry;
pub mod token;
pub mod user;

pub use client::{AuthBackend, HttpAuthBackend};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use errors::{Error, Result};
pub use retry::{ensure_authorized, with_reauth};
pub use scheduler::{
    RefreshEvent, RefreshHandlers, RefreshScheduler, RefreshSchedulerBuilder, SchedulerFailure,
    SchedulerStatus,
};
pub use token::{CredentialStore, MemoryCredentialStore, RefreshPolicy, TokenPair};
pub use user::{JwtUserDecoder, UserDecoder, UserIdentity};

#[cfg(test)]
mod tests;
