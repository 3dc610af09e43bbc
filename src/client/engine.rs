use std::sync::Arc;

use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::cache::token::CachedToken;
use crate::cache::token_cache::TokenCacheEntry;
use crate::error::{FetchError, OutboundError};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::resilience::single_flight::SingleFlight;
use crate::sources::token_endpoint::TokenEndpoint;
use crate::sources::FetchToken;

/// Cache + single-flight core shared by both client variants.
///
/// The engine is written once against futures; the non-blocking client awaits
/// them directly, the blocking client drives them on its own runtime.
pub struct TokenEngine<S = TokenEndpoint> {
    source: Arc<S>,
    cache: Arc<TokenCacheEntry>,
    flight: SingleFlight<Arc<CachedToken>, FetchError>,
    variant: &'static str,
}

impl<S> std::fmt::Debug for TokenEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEngine")
            .field("variant", &self.variant)
            .field("cache", &self.cache)
            .finish()
    }
}

impl<S: FetchToken> TokenEngine<S> {
    pub fn new(source: S, cache: TokenCacheEntry, variant: &'static str) -> Self {
        Self {
            source: Arc::new(source),
            cache: Arc::new(cache),
            flight: SingleFlight::new(),
            variant,
        }
    }

    /// Cached token, or the result of the one in-flight fetch.
    pub async fn get_token(&self) -> Result<Arc<CachedToken>, FetchError> {
        if let Some(token) = self.cache.get() {
            get_metrics().token_cache_hits.with_label_values(&[self.variant]).inc();
            debug!(client = self.variant, "token served from cache");
            return Ok(token);
        }

        let source = self.source.clone();
        let cache = self.cache.clone();
        let variant = self.variant;
        self.flight
            .run(move || async move {
                // a flight may have refilled the cache between our miss and becoming leader
                if let Some(token) = cache.get() {
                    return Ok(token);
                }
                refresh(source.as_ref(), &cache, variant).await
            })
            .await
    }

    /// Force the next `get_token` to fetch.
    pub fn clear_token(&self) {
        self.cache.clear();
        get_metrics().token_clears.with_label_values(&[self.variant]).inc();
        info!(client = self.variant, "cached token cleared");
    }

    /// Attach the bearer token and send; a 401 answer clears the cached token.
    ///
    /// The 401 is not distinguished from other causes (an outage answering 401
    /// also clears). The response is handed back untouched for the caller to
    /// decide on retries.
    pub async fn send_authorized(&self, request: RequestBuilder) -> Result<Response, OutboundError> {
        let token = self.get_token().await?;
        let response = request.bearer_auth(&token.access_token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(client = self.variant, url = %response.url(), "downstream rejected token, clearing cache");
            self.clear_token();
        }
        Ok(response)
    }

    pub fn cache(&self) -> &TokenCacheEntry {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

async fn refresh<S: FetchToken>(
    source: &S,
    cache: &TokenCacheEntry,
    variant: &'static str,
) -> Result<Arc<CachedToken>, FetchError> {
    let metrics = get_metrics();
    let start = get_instant();
    metrics.token_fetch_requests.with_label_values(&[variant]).inc();

    let result = source.fetch_token().await;
    metrics
        .token_fetch_duration
        .with_label_values(&[variant])
        .observe(start.elapsed().as_secs_f64());

    match result {
        Ok(token) => {
            info!(client = variant, expires_at = token.expires_at, "fetched new access token");
            Ok(cache.set(token))
        }
        Err(e) => {
            // the cache keeps whatever it had; the next call tries again
            metrics.token_fetch_failures.with_label_values(&[variant, e.kind()]).inc();
            warn!(client = variant, error = %e, "access token fetch failed");
            Err(e)
        }
    }
}
