use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair plus the instants at which each stops being valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_expiry: Timestamp,
    pub refresh_token: String,
    pub refresh_token_expiry: Timestamp,
}

impl TokenPair {
    pub fn new(
        access_token: impl Into<String>,
        access_token_expiry: Timestamp,
        refresh_token: impl Into<String>,
        refresh_token_expiry: Timestamp,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            access_token_expiry,
            refresh_token: refresh_token.into(),
            refresh_token_expiry,
        }
    }

    /// Both tokens present and the refresh token outlives the access token.
    ///
    /// Construction does not enforce this; stores use it to decide whether a
    /// session exists at all.
    pub fn is_consistent(&self) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && self.refresh_token_expiry >= self.access_token_expiry
    }

    /// Time left on the access token; negative once expired.
    pub fn access_remaining(&self, now: Timestamp) -> SignedDuration {
        self.access_token_expiry.duration_since(now)
    }

    pub fn is_refresh_expired(&self, now: Timestamp) -> bool {
        now >= self.refresh_token_expiry
    }
}
