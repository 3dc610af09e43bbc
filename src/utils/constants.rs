//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 5;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_EXPECTED_ALGORITHM: &str = "RS256";
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// Authorization server paths, relative to the issuer
pub const TOKEN_ENDPOINT_PATH: &str = "/api/v1/oauth2/token";
pub const JWKS_ENDPOINT_PATH: &str = "/api/v1/oauth2/jwks";

// Environment variables
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const ENV_VANITY_DOMAIN: &str = "APPLICATION_VANITY_DOMAIN";
