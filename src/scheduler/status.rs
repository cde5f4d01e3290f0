use std::time::Duration;

use jiff::Timestamp;
use serde::Serialize;

/// Point-in-time view of the scheduler for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub is_active: bool,
    pub has_valid_tokens: bool,
    pub access_token_expiry: Option<Timestamp>,
    pub refresh_token_expiry: Option<Timestamp>,
    /// Only evaluated while active; `false` otherwise.
    pub refresh_due: bool,
    /// Interval of the currently armed timer.
    pub check_interval: Option<Duration>,
}
