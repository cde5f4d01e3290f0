use std::time::Duration;

use jiff::SignedDuration;

use crate::errors::Error;

const DEFAULT_MIN_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_MAX_CHECK_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_BUFFER_MULTIPLIER: f64 = 0.2;

/// Bounds governing how often the scheduler polls and how early it refreshes.
///
/// Validated once at construction and immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshPolicy {
    min_check_interval: Duration,
    max_check_interval: Duration,
    refresh_buffer_multiplier: f64,
    min_refresh_buffer: Duration,
    max_refresh_buffer: Duration,
}

impl RefreshPolicy {
    pub fn new(
        min_check_interval: Duration,
        max_check_interval: Duration,
        refresh_buffer_multiplier: f64,
        min_refresh_buffer: Duration,
        max_refresh_buffer: Duration,
    ) -> Result<Self, Error> {
        if min_check_interval.is_zero() {
            return Err(Error::Config("Minimum check interval must be > 0".into()));
        }
        if min_check_interval > max_check_interval {
            return Err(Error::Config(
                "Minimum check interval cannot exceed the maximum".into(),
            ));
        }
        if !(refresh_buffer_multiplier > 0.0 && refresh_buffer_multiplier <= 1.0) {
            return Err(Error::Config(format!(
                "Refresh buffer multiplier must be in (0, 1] (got {})",
                refresh_buffer_multiplier
            )));
        }
        if min_refresh_buffer > max_refresh_buffer {
            return Err(Error::Config(
                "Minimum refresh buffer cannot exceed the maximum".into(),
            ));
        }
        Ok(Self {
            min_check_interval,
            max_check_interval,
            refresh_buffer_multiplier,
            min_refresh_buffer,
            max_refresh_buffer,
        })
    }

    /// Builds a policy whose buffers are derived from the check bounds:
    /// twice the minimum interval and one and a half times the maximum.
    pub fn from_check_bounds(
        min_check_interval: Duration,
        max_check_interval: Duration,
        refresh_buffer_multiplier: f64,
    ) -> Result<Self, Error> {
        let (min_refresh_buffer, max_refresh_buffer) =
            derived_buffers(min_check_interval, max_check_interval);
        Self::new(
            min_check_interval,
            max_check_interval,
            refresh_buffer_multiplier,
            min_refresh_buffer,
            max_refresh_buffer,
        )
    }

    pub fn min_check_interval(&self) -> Duration {
        self.min_check_interval
    }

    pub fn max_check_interval(&self) -> Duration {
        self.max_check_interval
    }

    pub fn refresh_buffer_multiplier(&self) -> f64 {
        self.refresh_buffer_multiplier
    }

    pub fn min_refresh_buffer(&self) -> Duration {
        self.min_refresh_buffer
    }

    pub fn max_refresh_buffer(&self) -> Duration {
        self.max_refresh_buffer
    }

    /// One tenth of the remaining lifetime, clamped to the check bounds.
    /// Unknown lifetime polls at the minimum interval.
    pub fn check_interval(&self, lifetime: Option<SignedDuration>) -> Duration {
        let Some(lifetime) = lifetime else {
            return self.min_check_interval;
        };
        let lifetime = Duration::try_from(lifetime).unwrap_or(Duration::ZERO);
        (lifetime / 10).clamp(self.min_check_interval, self.max_check_interval)
    }

    /// Remaining-lifetime threshold at or below which a refresh fires.
    pub fn refresh_buffer(&self, remaining: Duration) -> Duration {
        remaining
            .mul_f64(self.refresh_buffer_multiplier)
            .clamp(self.min_refresh_buffer, self.max_refresh_buffer)
    }

    /// Unknown or already-elapsed expiry is always due.
    pub fn is_refresh_due(&self, remaining: Option<SignedDuration>) -> bool {
        let Some(remaining) = remaining else {
            return true;
        };
        match Duration::try_from(remaining) {
            Ok(remaining) => remaining <= self.refresh_buffer(remaining),
            Err(_) => true,
        }
    }
}

fn derived_buffers(min_check_interval: Duration, max_check_interval: Duration) -> (Duration, Duration) {
    (min_check_interval * 2, max_check_interval.mul_f64(1.5))
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        let (min_refresh_buffer, max_refresh_buffer) =
            derived_buffers(DEFAULT_MIN_CHECK_INTERVAL, DEFAULT_MAX_CHECK_INTERVAL);
        Self {
            min_check_interval: DEFAULT_MIN_CHECK_INTERVAL,
            max_check_interval: DEFAULT_MAX_CHECK_INTERVAL,
            refresh_buffer_multiplier: DEFAULT_BUFFER_MULTIPLIER,
            min_refresh_buffer,
            max_refresh_buffer,
        }
    }
}
