use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::blocking::M2mAuthClient;
use crate::client::non_blocking::AsyncM2mAuthClient;
use crate::config::settings::SettingsConfig;
use crate::jwt::{JwtPayload, JwtValidator};
use crate::observability::routes::metrics_router;
use crate::server::middleware::require_jwt;

pub const PROTECTED_DATA_PATH: &str = "/api/protected/data";
pub const SYNC_PUBLIC_DATA_PATH: &str = "/api/sync/public/data";
pub const ASYNC_PUBLIC_DATA_PATH: &str = "/api/async/public/data";

/// Clients the public routes use to call the protected route.
#[derive(Clone)]
pub struct PublicApiState {
    pub async_client: AsyncM2mAuthClient,
    pub blocking_client: Arc<M2mAuthClient>,
    /// `PROTECTED_DATA_PATH` on this server
    pub protected_url: String,
    http: Client,
    // requests sent by the blocking client run on its own runtime; keep its
    // pooled connections apart
    blocking_http: Client,
}

impl PublicApiState {
    pub fn new(
        async_client: AsyncM2mAuthClient,
        blocking_client: M2mAuthClient,
        base_url: &str,
        http_timeout_ms: u64,
    ) -> Result<Self> {
        let build = || {
            Client::builder()
                .timeout(std::time::Duration::from_millis(http_timeout_ms))
                .build()
                .context("failed to build HTTP client")
        };
        Ok(Self {
            async_client,
            blocking_client: Arc::new(blocking_client),
            protected_url: format!("{}{}", base_url.trim_end_matches('/'), PROTECTED_DATA_PATH),
            http: build()?,
            blocking_http: build()?,
        })
    }
}

/// Demo routes: the protected endpoint, one public endpoint per client
/// variant calling it, and `/metrics` when enabled.
pub fn router(settings: &SettingsConfig, validator: Arc<JwtValidator>, public: PublicApiState) -> Router {
    let protected = Router::new()
        .route(PROTECTED_DATA_PATH, get(protected_data))
        .route_layer(middleware::from_fn_with_state(validator, require_jwt));

    let public = Router::new()
        .route(SYNC_PUBLIC_DATA_PATH, get(sync_public_data))
        .route(ASYNC_PUBLIC_DATA_PATH, get(async_public_data))
        .with_state(public);

    Router::new()
        .merge(protected)
        .merge(public)
        .merge(metrics_router(&settings.metrics))
}

/// Start the demo server and serve until the process is stopped.
pub async fn start(settings: &SettingsConfig, validator: Arc<JwtValidator>, public: PublicApiState) -> Result<()> {
    let app = router(settings, validator, public);
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn protected_data(Extension(payload): Extension<JwtPayload>) -> Json<Value> {
    Json(json!({
        "message": format!(
            "Hello from the protected API! Subject: {}",
            payload.sub.as_deref().unwrap_or("unknown")
        ),
    }))
}

async fn sync_public_data(State(state): State<PublicApiState>) -> Response {
    let client = state.blocking_client.clone();
    let request = state.blocking_http.get(&state.protected_url);
    let sent = tokio::task::spawn_blocking(move || client.send_authorized(request)).await;

    let result = match sent {
        Ok(Ok(response)) => protected_message(response).await,
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("blocking call failed: {}", e)),
    };
    public_response("Sync", result)
}

async fn async_public_data(State(state): State<PublicApiState>) -> Response {
    let result = match state.async_client.send_authorized(state.http.get(&state.protected_url)).await {
        Ok(response) => protected_message(response).await,
        Err(e) => Err(e.to_string()),
    };
    public_response("Async", result)
}

/// `message` field of a protected API answer; non-2xx answers are errors.
async fn protected_message(response: reqwest::Response) -> Result<Value, String> {
    let response = response.error_for_status().map_err(|e| e.to_string())?;
    let body: Value = response.json().await.map_err(|e| e.to_string())?;
    Ok(body.get("message").cloned().unwrap_or(Value::Null))
}

fn public_response(variant: &str, result: Result<Value, String>) -> Response {
    match result {
        Ok(message) => Json(json!({
            "public_message": format!("{} public API called protected API successfully!", variant),
            "protected_message": message,
            "timestamp": chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }))
        .into_response(),
        Err(error) => {
            warn!(variant, error = %error, "protected API call failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": error }))).into_response()
        }
    }
}
