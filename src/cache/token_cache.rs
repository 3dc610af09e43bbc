use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::cache::token::CachedToken;
use crate::helpers::time::Clock;

/// Single cached credential owned by one token client.
///
/// All operations hold the lock only for a clone or a pointer swap, never across I/O.
#[derive(Debug)]
pub struct TokenCacheEntry {
    inner: RwLock<Option<Arc<CachedToken>>>,
    safety_margin_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl TokenCacheEntry {
    pub fn new(safety_margin_seconds: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(None),
            safety_margin_seconds,
            clock,
        }
    }

    /// Cached token if it is still usable, taking the safety margin into account.
    pub fn get(&self) -> Option<Arc<CachedToken>> {
        let now = self.clock.now_unix();
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|token| token.is_usable_at(now, self.safety_margin_seconds))
            .cloned()
    }

    /// Replace the entry atomically.
    pub fn set(&self, token: CachedToken) -> Arc<CachedToken> {
        let token = Arc::new(token);
        debug!(expires_at = token.expires_at, "token cache entry replaced");
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    /// Invalidate immediately.
    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn safety_margin_seconds(&self) -> u64 {
        self.safety_margin_seconds
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
