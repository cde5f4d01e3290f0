mod outcome;
mod reauth;

pub use outcome::RetryOutcome;
pub use reauth::{ensure_authorized, with_reauth};
