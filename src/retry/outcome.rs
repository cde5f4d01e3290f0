use tracing::Level;
use tracing::event;

/// Summary of one reauth-guarded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    pub operation: String,
    pub attempts: u8,
    pub refreshed: bool,
    pub success: bool,
}

impl RetryOutcome {
    pub fn log(&self) {
        event!(
            Level::INFO,
            operation = %self.operation,
            attempts = self.attempts,
            refreshed = self.refreshed,
            success = self.success,
            "retry.outcome"
        );
    }
}
