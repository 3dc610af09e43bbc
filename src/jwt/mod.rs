//! Inbound token validation.
//!
//! `extract_bearer_token` pulls the token out of an `Authorization` header,
//! `JwtValidator::validate` checks structure, algorithm, signature (via the
//! `KeyResolver`), expiry and issuer, in that order.

pub mod bearer;
pub mod claims;
pub mod key_resolver;
pub mod validator;

pub use bearer::extract_bearer_token;
pub use claims::{Audience, JwtPayload, ValidationResult};
pub use key_resolver::KeyResolver;
pub use validator::JwtValidator;
