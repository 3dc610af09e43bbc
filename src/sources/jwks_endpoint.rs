use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use tracing::{debug, warn};

use crate::cache::key_cache::KeySet;
use crate::error::FetchError;
use crate::helpers::time::Clock;
use crate::sources::FetchKeySet;

/// Well-known JWKS endpoint of the issuer.
#[derive(Debug, Clone)]
pub struct JwksEndpoint {
    url: String,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl JwksEndpoint {
    pub fn new(url: String, client: Client, clock: Arc<dyn Clock>) -> Self {
        Self { url, client, clock }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FetchKeySet for JwksEndpoint {
    async fn fetch_key_set(&self) -> Result<KeySet, FetchError> {
        debug!(url = %self.url, "fetching JWKS");

        let response = self
            .client
            .get(&self.url)
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::transport(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: self.url.clone(), status: status.as_u16() });
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| FetchError::decode(&self.url, e))?;

        Ok(KeySet::new(decoding_keys(&jwks), self.clock.now_unix()))
    }
}

/// Keys without a `kid` or with unusable material are skipped, not fatal.
fn decoding_keys(jwks: &JwkSet) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::with_capacity(jwks.keys.len());
    for jwk in &jwks.keys {
        let Some(kid) = jwk.common.key_id.as_ref() else {
            warn!("skipping JWK without kid");
            continue;
        };
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid.clone(), key);
            }
            Err(e) => warn!(kid = %kid, error = %e, "skipping unusable JWK"),
        }
    }
    keys
}
