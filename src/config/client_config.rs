use std::fmt;

use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::utils::constants::{
    ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_VANITY_DOMAIN, JWKS_ENDPOINT_PATH, TOKEN_ENDPOINT_PATH,
};

/// Credentials and issuer domain of this service's M2M application.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    client_id: String,
    client_secret: String,
    vanity_domain: String,
}

impl ClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        vanity_domain: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let vanity_domain = vanity_domain.into();

        if client_id.trim().is_empty() {
            return Err(ConfigError::Empty("client_id"));
        }
        if client_secret.trim().is_empty() {
            return Err(ConfigError::Empty("client_secret"));
        }
        if vanity_domain.trim().is_empty() {
            return Err(ConfigError::Empty("vanity_domain"));
        }

        Ok(Self { client_id, client_secret, vanity_domain })
    }

    /// Read `CLIENT_ID`, `CLIENT_SECRET` and `APPLICATION_VANITY_DOMAIN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let read = |name: &'static str| std::env::var(name).map_err(|_| ConfigError::MissingEnv(name));
        Self::new(read(ENV_CLIENT_ID)?, read(ENV_CLIENT_SECRET)?, read(ENV_VANITY_DOMAIN)?)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn vanity_domain(&self) -> &str {
        &self.vanity_domain
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("vanity_domain", &self.vanity_domain)
            .finish()
    }
}

/// Raw `client` section of the YAML config, before validation.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientSection {
    pub client_id: String,
    pub client_secret: String,
    pub vanity_domain: String,
}

impl TryFrom<&ClientSection> for ClientConfig {
    type Error = ConfigError;

    fn try_from(section: &ClientSection) -> Result<Self, Self::Error> {
        ClientConfig::new(&section.client_id, &section.client_secret, &section.vanity_domain)
    }
}

/// Issuer and endpoint URLs of the authorization server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub issuer: String,
    pub token_url: String,
    pub jwks_url: String,
}

impl Endpoints {
    /// `https://{vanity_domain}` and the well-known paths below it.
    pub fn for_vanity_domain(vanity_domain: &str) -> Self {
        let domain = vanity_domain
            .trim()
            .trim_start_matches("https://")
            .trim_end_matches('/');
        Self::from_base_url(&format!("https://{}", domain))
    }

    /// Any base url, scheme included; the base doubles as the expected issuer.
    pub fn from_base_url(base_url: &str) -> Self {
        let issuer = base_url.trim_end_matches('/').to_owned();
        Self {
            token_url: format!("{}{}", issuer, TOKEN_ENDPOINT_PATH),
            jwks_url: format!("{}{}", issuer, JWKS_ENDPOINT_PATH),
            issuer,
        }
    }

    pub fn resolve(config: &ClientConfig, base_url: Option<&str>) -> Self {
        match base_url {
            Some(base) => Self::from_base_url(base),
            None => Self::for_vanity_domain(config.vanity_domain()),
        }
    }
}

/// Parse a configured algorithm name, accepting asymmetric algorithms only.
pub fn parse_expected_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let algorithm: Algorithm = name
        .trim()
        .parse()
        .map_err(|_| ConfigError::UnsupportedAlgorithm(name.to_owned()))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            Err(ConfigError::UnsupportedAlgorithm(name.to_owned()))
        }
        asymmetric => Ok(asymmetric),
    }
}
