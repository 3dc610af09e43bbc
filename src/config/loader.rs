use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::client_config::{parse_expected_algorithm, ClientConfig, ClientSection};
use crate::config::settings::{LoggingConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub client: ClientSection,
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl ServiceConfig {
    pub fn client_config(&self) -> Result<ClientConfig> {
        ClientConfig::try_from(&self.client).map_err(|e| anyhow!("invalid client config: {}", e))
    }
}

/// Load and validate config from YAML file
pub fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&expand_env_vars(&content))
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig = serde_yaml::from_str(content).inspect_err(|e| {
        error!("parse config error: {}", e);
        get_metrics().config_errors.inc();
    })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }

    debug!("validating config ...");
    validate(&service_config).inspect_err(|_| get_metrics().config_errors.inc())?;
    Ok(service_config)
}

fn validate(config: &ServiceConfig) -> Result<()> {
    config.client_config()?;
    parse_expected_algorithm(&config.settings.expected_algorithm)?;

    if let Some(retry) = &config.settings.retry {
        if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
            if max < base {
                return Err(anyhow!(
                    "settings.retry.max_delay_ms ({}) must be >= base_delay_ms ({})",
                    max,
                    base
                ));
            }
        }
    }
    if config.settings.http_timeout_ms == 0 {
        return Err(anyhow!("settings.http_timeout_ms must be greater than 0"));
    }
    Ok(())
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
