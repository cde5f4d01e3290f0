use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    client::{AuthBackend, HttpAuthBackend},
    clock::{Clock, SystemClock},
    config::Config,
    errors::Error,
    token::{TokenPair, jwt},
};

const USER_AGENT: &str = concat!("session-refresh/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    refresh_expires_in: Option<i64>,
}

impl HttpAuthBackend {
    pub fn new(refresh_url: &str, timeout: Duration) -> Result<Self, Error> {
        let refresh_url = Url::parse(refresh_url)
            .map_err(|e| Error::Config(format!("Invalid refresh URL '{}': {}", refresh_url, e)))?;
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            refresh_url,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(&config.refresh_url(), config.request_timeout())
    }

    /// Replaces the clock used to turn relative `expiresIn` values into instants.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        let resp = self
            .http
            .post(self.refresh_url.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            warn!("refresh token rejected: status={} body='{}'", status, body);
            return Err(Error::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("refresh request failed: status={} body='{}'", status, body);
            return Err(Error::Http(status, body));
        }

        let body = resp.text().await?;
        let parsed: RefreshResponse =
            serde_json::from_str(&body).map_err(|e| Error::Malformed(e.to_string()))?;
        if parsed.access_token.is_empty() || parsed.refresh_token.is_empty() {
            return Err(Error::Malformed("empty token in refresh response".into()));
        }

        let now = self.clock.now();
        let access_expiry = resolve_expiry(now, parsed.expires_in, &parsed.access_token, "access")?;
        let refresh_expiry = resolve_expiry(
            now,
            parsed.refresh_expires_in,
            &parsed.refresh_token,
            "refresh",
        )?;
        info!(
            "token pair refreshed: access_expiry={} refresh_expiry={}",
            access_expiry, refresh_expiry
        );
        Ok(TokenPair::new(
            parsed.access_token,
            access_expiry,
            parsed.refresh_token,
            refresh_expiry,
        ))
    }
}

/// Relative lifetime wins; otherwise fall back to the token's own `exp` claim.
fn resolve_expiry(
    now: Timestamp,
    expires_in: Option<i64>,
    token: &str,
    label: &str,
) -> Result<Timestamp, Error> {
    if let Some(secs) = expires_in {
        return now
            .checked_add(SignedDuration::from_secs(secs))
            .map_err(|e| Error::Malformed(format!("{} token expiry out of range: {}", label, e)));
    }
    jwt::expiry(token)
        .ok_or_else(|| Error::Malformed(format!("{} token carries no expiry", label)))
}
