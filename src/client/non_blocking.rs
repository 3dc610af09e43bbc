use std::sync::Arc;

use reqwest::{RequestBuilder, Response};

use crate::cache::token_cache::TokenCacheEntry;
use crate::client::build_http_client;
use crate::client::engine::TokenEngine;
use crate::config::client_config::{ClientConfig, Endpoints};
use crate::config::settings::SettingsConfig;
use crate::error::{ClientBuildError, FetchError, OutboundError};
use crate::helpers::time::{Clock, SystemClock};
use crate::sources::token_endpoint::TokenEndpoint;

const VARIANT: &str = "non_blocking";

/// M2M token client for async callers.
///
/// Cloning yields another handle to the same cache and in-flight slot.
#[derive(Debug, Clone)]
pub struct AsyncM2mAuthClient {
    engine: Arc<TokenEngine<TokenEndpoint>>,
}

impl AsyncM2mAuthClient {
    pub fn new(config: Arc<ClientConfig>, settings: &SettingsConfig) -> Result<Self, ClientBuildError> {
        Self::with_clock(config, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Arc<ClientConfig>,
        settings: &SettingsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ClientBuildError> {
        let endpoints = Endpoints::resolve(&config, settings.base_url.as_deref());
        let source = TokenEndpoint::new(
            endpoints.token_url,
            config,
            build_http_client(settings)?,
            clock.clone(),
        );
        let cache = TokenCacheEntry::new(settings.safety_margin_seconds, clock);
        Ok(Self { engine: Arc::new(TokenEngine::new(source, cache, VARIANT)) })
    }

    pub async fn get_token(&self) -> Result<String, FetchError> {
        self.engine.get_token().await.map(|token| token.access_token.clone())
    }

    pub fn clear_token(&self) {
        self.engine.clear_token()
    }

    pub async fn send_authorized(&self, request: RequestBuilder) -> Result<Response, OutboundError> {
        self.engine.send_authorized(request).await
    }
}
