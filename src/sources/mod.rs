/// Sources module
///
/// The two outbound fetches of the auth layer: the client-credentials token
/// endpoint and the issuer's JWKS endpoint. Both are the only operations that
/// suspend; caches around them never hold a lock across these calls.
use std::future::Future;

use crate::cache::key_cache::KeySet;
use crate::cache::token::CachedToken;
use crate::error::FetchError;

pub mod jwks_endpoint;
pub mod token_endpoint;

pub trait FetchToken: Send + Sync + 'static {
    fn fetch_token(&self) -> impl Future<Output = Result<CachedToken, FetchError>> + Send;
}

pub trait FetchKeySet: Send + Sync + 'static {
    fn fetch_key_set(&self) -> impl Future<Output = Result<KeySet, FetchError>> + Send;
}
