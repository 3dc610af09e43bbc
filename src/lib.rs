//! # M2M Auth Library
//!
//! Machine-to-machine authentication for services talking to one issuer:
//! an OAuth2 client-credentials token client (blocking and async) with a
//! shared, single-flighted token cache, and an inbound JWT validator that
//! resolves signing keys from the issuer's JWKS.
//!
//! Modules:
//! - `client` - blocking and async token clients over one token engine
//! - `jwt` - bearer extraction, key resolution and token validation
//! - `cache` - token and key-set caches
//! - `sources` - token and JWKS endpoint fetches
//! - `config` - client credentials, endpoints, YAML service settings
//! - `server` - axum middleware and the demo protected API

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod jwt;
pub mod observability;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::client::blocking::M2mAuthClient;
pub use crate::client::non_blocking::AsyncM2mAuthClient;
pub use crate::config::client_config::ClientConfig;
pub use crate::config::loader::ServiceConfig;
pub use crate::error::{FetchError, InvalidReason, MissingTokenError};
pub use crate::jwt::{extract_bearer_token, JwtPayload, JwtValidator, ValidationResult};
