//! Concurrency-safe caches: the token client's single credential entry and
//! the key resolver's JWKS.

pub mod key_cache;
pub mod token;
pub mod token_cache;
