use jiff::Timestamp;
use parking_lot::RwLock;

use super::TokenPair;

/// Holder of the current session's tokens. The scheduler queries it afresh on
/// every evaluation and never caches expiry itself.
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn access_token_expiry(&self) -> Option<Timestamp>;
    fn refresh_token_expiry(&self) -> Option<Timestamp>;
    /// A structurally usable pair is present.
    fn has_valid_tokens(&self) -> bool;
    fn is_refresh_token_expired(&self, now: Timestamp) -> bool;
    fn set_tokens(&self, pair: TokenPair);
    fn clear_tokens(&self);
}

/// In-process store guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<Option<TokenPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }

    pub fn snapshot(&self) -> Option<TokenPair> {
        self.pair.read().clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.pair.read().as_ref().map(|p| p.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.pair.read().as_ref().map(|p| p.refresh_token.clone())
    }

    fn access_token_expiry(&self) -> Option<Timestamp> {
        self.pair.read().as_ref().map(|p| p.access_token_expiry)
    }

    fn refresh_token_expiry(&self) -> Option<Timestamp> {
        self.pair.read().as_ref().map(|p| p.refresh_token_expiry)
    }

    fn has_valid_tokens(&self) -> bool {
        self.pair
            .read()
            .as_ref()
            .is_some_and(TokenPair::is_consistent)
    }

    fn is_refresh_token_expired(&self, now: Timestamp) -> bool {
        self.pair
            .read()
            .as_ref()
            .is_none_or(|p| p.is_refresh_expired(now))
    }

    fn set_tokens(&self, pair: TokenPair) {
        *self.pair.write() = Some(pair);
    }

    fn clear_tokens(&self) {
        self.pair.write().take();
    }
}
