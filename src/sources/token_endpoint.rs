use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::token::CachedToken;
use crate::config::client_config::ClientConfig;
use crate::error::FetchError;
use crate::helpers::time::Clock;
use crate::sources::FetchToken;

const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Body of a successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: u64,
}

/// OAuth2 client-credentials grant against the authorization server.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    url: String,
    config: Arc<ClientConfig>,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl TokenEndpoint {
    pub fn new(url: String, config: Arc<ClientConfig>, client: Client, clock: Arc<dyn Clock>) -> Self {
        Self { url, config, client, clock }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FetchToken for TokenEndpoint {
    async fn fetch_token(&self) -> Result<CachedToken, FetchError> {
        debug!(url = %self.url, client_id = %self.config.client_id(), "requesting client-credentials token");

        let response = self
            .client
            .post(&self.url)
            .basic_auth(self.config.client_id(), Some(self.config.client_secret()))
            .form(&[("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS)])
            .send()
            .await
            .map_err(|e| FetchError::transport(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "token request rejected");
            return Err(FetchError::Status { url: self.url.clone(), status: status.as_u16() });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| FetchError::decode(&self.url, e))?;
        if body.access_token.is_empty() {
            return Err(FetchError::decode(&self.url, "empty access_token"));
        }

        // expires_in is relative to receipt
        let expires_in =
            i64::try_from(body.expires_in).map_err(|_| FetchError::decode(&self.url, "expires_in out of range"))?;
        let expires_at = self.clock.now_unix().saturating_add(expires_in);
        Ok(CachedToken::new(body.access_token, expires_at, body.token_type))
    }
}
