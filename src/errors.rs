use reqwest::StatusCode;

/// Convenience result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http transport error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("unexpected status {0}: {1}")]
    Http(StatusCode, String),
    #[error("refresh token rejected: {0}")]
    Rejected(String),
    #[error("malformed refresh response: {0}")]
    Malformed(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("no valid session")]
    NoSession,
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
