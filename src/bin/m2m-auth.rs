use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use m2m_auth::config::client_config::ClientConfig;
use m2m_auth::config::loader::file_to_config;
use m2m_auth::config::settings::SettingsConfig;
use m2m_auth::jwt::{JwtValidator, ValidationResult};
use m2m_auth::resilience::retry::RetrySettings;
use m2m_auth::server;
use m2m_auth::server::server::PublicApiState;
use m2m_auth::utils::logging::{self, LogLevel};
use m2m_auth::{AsyncM2mAuthClient, M2mAuthClient};
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config; when the file is absent credentials come from the environment
    #[arg(short, long, env = "M2M_AUTH_CONFIG", default_value = "m2m-auth.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Warm up both token clients
    Token {
        /// write the access token to stdout
        #[arg(long)]
        print: bool,
    },
    /// Validate the bearer token in an Authorization header value
    Validate {
        #[arg(long)]
        header: String,
    },
    /// Run the demo protected API
    Serve,
}

// Sync main: the blocking client must not be driven from inside a runtime.
fn main() -> Result<()> {
    let args = Args::parse();

    // -------------------------------
    // 1. Load config
    // -------------------------------

    let (client_config, settings) = load_config(Path::new(&args.config))?;
    logging::run(&settings, args.log_level);
    let client_config = Arc::new(client_config);
    let retry = RetrySettings::from(settings.retry.as_ref());

    match args.command.unwrap_or(Command::Token { print: false }) {
        Command::Token { print } => {
            // -------------------------------
            // 2. Warm up the blocking client on this thread
            // -------------------------------

            let blocking = M2mAuthClient::new(client_config.clone(), &settings)?;
            warm_up_blocking(&blocking, &retry);

            // -------------------------------
            // 3. Warm up the async client
            // -------------------------------

            let runtime = build_runtime()?;
            let client = AsyncM2mAuthClient::new(client_config, &settings)?;
            runtime.block_on(warm_up(&client, &retry));

            if print {
                println!("{}", blocking.get_token()?);
            }
            Ok(())
        }
        Command::Validate { header } => {
            let validator = JwtValidator::new(&client_config, &settings)?;
            let token = validator.extract_bearer_token(Some(header.as_str()))?;
            let runtime = build_runtime()?;
            match runtime.block_on(validator.validate(token))? {
                ValidationResult::Valid { payload } => {
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                    Ok(())
                }
                ValidationResult::Invalid { reason } => Err(anyhow::anyhow!("token rejected: {}", reason)),
            }
        }
        Command::Serve => {
            let validator = Arc::new(JwtValidator::new(&client_config, &settings)?);
            let blocking = M2mAuthClient::new(client_config.clone(), &settings)?;
            warm_up_blocking(&blocking, &retry);

            let client = AsyncM2mAuthClient::new(client_config, &settings)?;
            let runtime = build_runtime()?;
            runtime.block_on(async {
                warm_up(&client, &retry).await;
                let public = PublicApiState::new(client, blocking, &self_base_url(&settings), settings.http_timeout_ms)?;
                info!("Service starting...");
                server::server::start(&settings, validator, public).await
            })
        }
    }
}

fn load_config(path: &Path) -> Result<(ClientConfig, SettingsConfig)> {
    if path.exists() {
        let service_config = file_to_config(path)?;
        let client_config = service_config.client_config()?;
        return Ok((client_config, service_config.settings));
    }
    let client_config = ClientConfig::from_env()
        .with_context(|| format!("{} not found and environment is incomplete", path.display()))?;
    Ok((client_config, SettingsConfig::default()))
}

/// Where the public routes reach this server's protected route.
fn self_base_url(settings: &SettingsConfig) -> String {
    let host = match settings.server.host.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        host => host,
    };
    format!("http://{}:{}", host, settings.server.port)
}

fn build_runtime() -> Result<Runtime> {
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

fn warm_up_blocking(client: &M2mAuthClient, retry: &RetrySettings) {
    match retry.run_with_retry_blocking(|| client.get_token()) {
        Ok(_) => info!("blocking token client warmed up"),
        Err(e) => warn!("blocking token client warm-up failed: {}", e),
    }
}

async fn warm_up(client: &AsyncM2mAuthClient, retry: &RetrySettings) {
    match retry.run_with_retry(|| client.get_token()).await {
        Ok(_) => info!("async token client warmed up"),
        Err(e) => warn!("async token client warm-up failed: {}", e),
    }
}
