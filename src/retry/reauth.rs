//! Reactive recovery for requests rejected with 401.

use std::future::Future;

use reqwest::{Response, StatusCode};
use tracing::warn;

use crate::errors::Error;
use crate::scheduler::RefreshScheduler;

use super::RetryOutcome;

/// Maps a 401 response to [`Error::Unauthorized`] and other failures to
/// [`Error::Http`]; successful responses pass through.
pub async fn ensure_authorized(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        Err(Error::Unauthorized(format!("{}: {}", status, body)))
    } else {
        Err(Error::Http(status, body))
    }
}

/// Runs `op` with the stored access token. On [`Error::Unauthorized`] the
/// session is refreshed through [`RefreshScheduler::manual_refresh`] and `op`
/// is replayed once with the new token. A failed refresh or a second 401
/// yields [`Error::Auth`].
pub async fn with_reauth<F, Fut, T>(
    scheduler: &RefreshScheduler,
    operation: &str,
    mut op: F,
) -> Result<T, Error>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let token = scheduler.store().access_token().ok_or(Error::NoSession)?;
    let first_msg = match op(token).await {
        Err(Error::Unauthorized(msg)) => msg,
        other => {
            finish(operation, 1, false, other.is_ok());
            return other;
        }
    };
    warn!(operation, attempt = 1, "request returned 401: {}", first_msg);

    let Some(pair) = scheduler.manual_refresh().await else {
        finish(operation, 1, false, false);
        return Err(Error::Auth(format!(
            "401 from {} and session refresh failed",
            operation
        )));
    };

    match op(pair.access_token).await {
        Err(Error::Unauthorized(msg)) => {
            warn!(operation, attempt = 2, "request returned 401 after refresh: {}", msg);
            finish(operation, 2, true, false);
            Err(Error::Auth(format!(
                "401 from {} persisted after token refresh",
                operation
            )))
        }
        other => {
            finish(operation, 2, true, other.is_ok());
            other
        }
    }
}

fn finish(operation: &str, attempts: u8, refreshed: bool, success: bool) {
    RetryOutcome {
        operation: operation.to_string(),
        attempts,
        refreshed,
        success,
    }
    .log();
}
