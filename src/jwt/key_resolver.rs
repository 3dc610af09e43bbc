use std::sync::Arc;

use jsonwebtoken::DecodingKey;
use tracing::{debug, info, warn};

use crate::cache::key_cache::{JwksCache, KeySet};
use crate::error::{FetchError, ResolveError};
use crate::observability::metrics::get_metrics;
use crate::resilience::single_flight::SingleFlight;
use crate::sources::jwks_endpoint::JwksEndpoint;
use crate::sources::FetchKeySet;

/// Resolves verification keys by `kid`, refreshing the key set only on a miss.
///
/// There is no time-based expiry: the issuer is the source of truth and keys
/// rotate rarely, so an unknown `kid` is the only refresh trigger. Concurrent
/// misses share one JWKS fetch.
pub struct KeyResolver<S = JwksEndpoint> {
    source: Arc<S>,
    cache: Arc<JwksCache>,
    flight: SingleFlight<Arc<KeySet>, FetchError>,
}

impl<S> std::fmt::Debug for KeyResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyResolver").field("cache", &self.cache).finish()
    }
}

impl<S: FetchKeySet> KeyResolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            cache: Arc::new(JwksCache::new()),
            flight: SingleFlight::new(),
        }
    }

    pub async fn resolve_key(&self, kid: &str) -> Result<DecodingKey, ResolveError> {
        let seen = self.cache.snapshot();
        if let Some(key) = seen.get(kid) {
            return Ok(key.clone());
        }

        debug!(kid = %kid, "kid not in cached key set, refreshing");
        let key_set = self.refresh_since(Some(seen)).await?;

        // one refresh per lookup; a kid still missing now is not retried
        key_set.get(kid).cloned().ok_or_else(|| {
            warn!(kid = %kid, "kid absent after key set refresh");
            ResolveError::UnknownKey(kid.to_owned())
        })
    }

    /// Fetch the full key set and swap it in, joining a pending fetch if there is one.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, FetchError> {
        self.refresh_since(None).await
    }

    /// Like `refresh`, but a leader that finds the cache already replaced
    /// since `seen` was taken returns that set instead of fetching again.
    async fn refresh_since(&self, seen: Option<Arc<KeySet>>) -> Result<Arc<KeySet>, FetchError> {
        let source = self.source.clone();
        let cache = self.cache.clone();
        self.flight
            .run(move || async move {
                if let Some(seen) = seen {
                    let current = cache.snapshot();
                    if !Arc::ptr_eq(&current, &seen) {
                        debug!("key set refreshed by a previous flight, skipping fetch");
                        return Ok(current);
                    }
                }

                let metrics = get_metrics();
                metrics.jwks_fetch_requests.inc();
                match source.fetch_key_set().await {
                    Ok(key_set) => {
                        info!(keys = key_set.len(), "JWKS refreshed");
                        metrics.jwks_keys.set(key_set.len() as i64);
                        let key_set = Arc::new(key_set);
                        cache.replace(key_set.clone());
                        Ok(key_set)
                    }
                    Err(e) => {
                        metrics.jwks_fetch_failures.with_label_values(&[e.kind()]).inc();
                        warn!(error = %e, "JWKS fetch failed");
                        Err(e)
                    }
                }
            })
            .await
    }

    pub fn cache(&self) -> &JwksCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
