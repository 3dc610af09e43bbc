//! Error taxonomy of the auth layer.
//!
//! Network faults (`FetchError`, `ResolveError`) are surfaced to callers of
//! `get_token` / `resolve_key`. Token rejections are carried as `InvalidReason`
//! inside `ValidationResult::Invalid` and are never raised as hard failures.

use thiserror::Error;

/// Token or JWKS endpoint unreachable, answered with a non-success status,
/// or returned a body that could not be decoded.
///
/// `Clone` so a single in-flight fetch can hand the same failure to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The task running a shared fetch panicked or was cancelled.
    #[error("fetch task did not complete: {0}")]
    Interrupted(String),
}

impl FetchError {
    /// Transport errors and 5xx answers; everything else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Decode { .. } => false,
            FetchError::Interrupted(_) => true,
        }
    }

    pub(crate) fn transport(url: &str, err: reqwest::Error) -> Self {
        FetchError::Transport { url: url.to_owned(), message: err.to_string() }
    }

    pub(crate) fn decode(url: &str, message: impl ToString) -> Self {
        FetchError::Decode { url: url.to_owned(), message: message.to_string() }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
            FetchError::Interrupted(_) => "interrupted",
        }
    }
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(err: tokio::task::JoinError) -> Self {
        FetchError::Interrupted(err.to_string())
    }
}

/// Failure of `KeyResolver::resolve_key`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Key id still absent after a forced refresh of the key set.
    #[error("no key with id '{0}' in the key set")]
    UnknownKey(String),
}

/// Why a presented token was rejected.
///
/// `Display` yields the short diagnostic reason; callers facing untrusted
/// clients must map every variant to a generic "unauthorized".
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    #[error("malformed")]
    Malformed,

    #[error("unexpected algorithm")]
    UnexpectedAlgorithm,

    #[error("unknown key")]
    UnknownKey,

    #[error("bad signature")]
    BadSignature,

    #[error("expired")]
    Expired,

    #[error("issuer mismatch")]
    IssuerMismatch,
}

impl InvalidReason {
    /// Metric label.
    pub fn as_label(&self) -> &'static str {
        match self {
            InvalidReason::Malformed => "malformed",
            InvalidReason::UnexpectedAlgorithm => "unexpected_algorithm",
            InvalidReason::UnknownKey => "unknown_key",
            InvalidReason::BadSignature => "bad_signature",
            InvalidReason::Expired => "expired",
            InvalidReason::IssuerMismatch => "issuer_mismatch",
        }
    }
}

/// `Authorization` header absent or not of the form `Bearer <token>`.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("missing or malformed bearer token")]
pub struct MissingTokenError;

/// Failure of an outbound call made with a client's token.
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("could not obtain access token: {0}")]
    Token(#[from] FetchError),

    #[error("outbound request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("unsupported signing algorithm '{0}', expected an asymmetric one")]
    UnsupportedAlgorithm(String),
}

/// Failure while constructing a client or validator.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to start runtime for blocking client: {0}")]
    Runtime(#[from] std::io::Error),
}
