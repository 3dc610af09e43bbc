// tests/common/mod.rs
pub mod keys;

pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::Arc;

use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use reqwest::Client;
use tokio::net::TcpListener;

use crate::config::client_config::{ClientConfig, Endpoints};
use crate::config::settings::SettingsConfig;
use crate::utils::constants::{JWKS_ENDPOINT_PATH, TOKEN_ENDPOINT_PATH};

/// Bind an ephemeral port first, so a router can be told its own address.
pub async fn bind_ephemeral() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Serve an Axum router on a bound listener
pub fn spawn_axum(listener: TcpListener, router: Router) -> JoinHandle<()> {
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    })
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn client_config() -> Arc<ClientConfig> {
    Arc::new(ClientConfig::new("test-client", "test-secret", "auth.example.com").unwrap())
}

/// Settings pointing every endpoint at the mock server.
pub fn settings_for(server: &MockServer) -> SettingsConfig {
    SettingsConfig { base_url: Some(server.base_url()), ..SettingsConfig::default() }
}

pub fn endpoints_for(server: &MockServer) -> Endpoints {
    Endpoints::from_base_url(&server.base_url())
}

/// Token endpoint answering `access_token` after `delay_ms`.
pub fn mock_token_endpoint<'a>(
    server: &'a MockServer,
    access_token: &str,
    expires_in: u64,
    delay_ms: u64,
) -> Mock<'a> {
    let body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    });
    server.mock(|when, then| {
        when.method(POST).path(TOKEN_ENDPOINT_PATH);
        then.status(200)
            .header("Content-Type", "application/json")
            .delay(std::time::Duration::from_millis(delay_ms))
            .json_body(body);
    })
}

pub fn mock_jwks_endpoint<'a>(server: &'a MockServer, kids: &[&str]) -> Mock<'a> {
    let body = keys::jwks_json(kids);
    server.mock(|when, then| {
        when.method(GET).path(JWKS_ENDPOINT_PATH);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(body);
    })
}

/// Claim set issued by `issuer` for `sub`, expiring at `exp`.
pub fn claims(issuer: &str, sub: &str, exp: i64) -> serde_json::Value {
    json!({
        "sub": sub,
        "iss": issuer,
        "exp": exp,
        "iat": exp - 3600,
        "scope": "orders:read",
    })
}

/// Validator resolving keys from the mock server, on a manual clock.
pub fn validator_for(
    server: &MockServer,
    clock: Arc<crate::helpers::time::ManualClock>,
) -> crate::jwt::JwtValidator {
    crate::jwt::JwtValidator::with_clock(&client_config(), &settings_for(server), clock).expect("validator")
}

/// Public route clients for a server at `base_url`, fetching tokens from the mock server.
pub fn public_state_for(server: &MockServer, base_url: &str) -> crate::server::server::PublicApiState {
    let settings = settings_for(server);
    crate::server::server::PublicApiState::new(
        crate::client::non_blocking::AsyncM2mAuthClient::new(client_config(), &settings).expect("async client"),
        crate::client::blocking::M2mAuthClient::new(client_config(), &settings).expect("blocking client"),
        base_url,
        settings.http_timeout_ms,
    )
    .expect("public state")
}
