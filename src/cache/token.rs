use std::fmt;

use crate::utils::constants::DEFAULT_TOKEN_TYPE;

/// A client-credentials access token as held by a token client.
///
/// Replaced wholesale on refresh, never patched in place.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: i64, // UNIX TIMESTAMP
    pub token_type: String,
}

impl CachedToken {
    pub fn new(access_token: String, expires_at: i64, token_type: Option<String>) -> Self {
        Self {
            access_token,
            expires_at,
            token_type: token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_owned()),
        }
    }

    /// Usable while `now < expires_at - safety_margin`.
    pub fn is_usable_at(&self, now: i64, safety_margin_seconds: u64) -> bool {
        now < self.expires_at.saturating_sub(safety_margin_seconds as i64)
    }
}

// access tokens are credentials, keep them out of logs
impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}
