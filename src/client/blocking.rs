use std::future::Future;
use std::sync::Arc;

use reqwest::{RequestBuilder, Response};
use tokio::runtime::{Builder, Runtime};

use crate::cache::token_cache::TokenCacheEntry;
use crate::client::build_http_client;
use crate::client::engine::TokenEngine;
use crate::config::client_config::{ClientConfig, Endpoints};
use crate::config::settings::SettingsConfig;
use crate::error::{ClientBuildError, FetchError, OutboundError};
use crate::helpers::time::{Clock, SystemClock};
use crate::sources::token_endpoint::TokenEndpoint;

const VARIANT: &str = "blocking";

/// Waits for engine futures by parking the calling thread.
///
/// Backed by a private one-worker runtime so the engine's I/O keeps being
/// driven while any number of caller threads block on it.
#[derive(Debug)]
struct BlockOn {
    runtime: Option<Runtime>,
}

impl BlockOn {
    fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("m2m-auth-blocking")
            .enable_all()
            .build()?;
        Ok(Self { runtime: Some(runtime) })
    }

    fn wait<F: Future>(&self, future: F) -> F::Output {
        match &self.runtime {
            Some(runtime) => runtime.block_on(future),
            None => unreachable!("runtime is only taken on drop"),
        }
    }
}

impl Drop for BlockOn {
    fn drop(&mut self) {
        // never block in drop, the client may be dropped inside an async context
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// M2M token client for synchronous callers on ordinary threads.
///
/// Calls block the current thread. Do not call from inside an async runtime;
/// use [`crate::client::non_blocking::AsyncM2mAuthClient`] there, or
/// `spawn_blocking`.
#[derive(Debug)]
pub struct M2mAuthClient {
    engine: TokenEngine<TokenEndpoint>,
    block_on: BlockOn,
}

impl M2mAuthClient {
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
        Ok(Self {
            engine: TokenEngine::new(source, cache, VARIANT),
            block_on: BlockOn::new()?,
        })
    }

    pub fn get_token(&self) -> Result<String, FetchError> {
        self.block_on
            .wait(self.engine.get_token())
            .map(|token| token.access_token.clone())
    }

    pub fn clear_token(&self) {
        self.engine.clear_token()
    }

    pub fn send_authorized(&self, request: RequestBuilder) -> Result<Response, OutboundError> {
        self.block_on.wait(self.engine.send_authorized(request))
    }
}
