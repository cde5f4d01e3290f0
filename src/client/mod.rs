use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::clock::Clock;
use crate::errors::Error;
use crate::token::TokenPair;

mod impls;

/// Trades a refresh token for a brand-new token pair.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error>;
}

/// `AuthBackend` speaking JSON to a REST refresh endpoint.
#[derive(Clone)]
pub struct HttpAuthBackend {
    http: Client,
    refresh_url: Url,
    clock: Arc<dyn Clock>,
}
