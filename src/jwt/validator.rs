use std::collections::HashSet;
use std::sync::Arc;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::client::build_http_client;
use crate::config::client_config::{parse_expected_algorithm, ClientConfig, Endpoints};
use crate::config::settings::SettingsConfig;
use crate::error::{ClientBuildError, FetchError, InvalidReason, MissingTokenError, ResolveError};
use crate::helpers::time::{Clock, SystemClock};
use crate::jwt::bearer::extract_bearer_token;
use crate::jwt::claims::{JwtPayload, ValidationResult};
use crate::jwt::key_resolver::KeyResolver;
use crate::observability::metrics::get_metrics;
use crate::sources::jwks_endpoint::JwksEndpoint;
use crate::sources::FetchKeySet;

/// Header fields read before the signature is checked.
#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

/// Token split into its decoded parts; nothing here is trusted yet.
#[derive(Debug)]
struct ParsedToken {
    header: TokenHeader,
    payload: JwtPayload,
}

/// Validates inbound bearer tokens against the issuer's JWKS.
///
/// Rejections come back as `ValidationResult::Invalid`; only a failing JWKS
/// fetch is an error. Safe to share and call concurrently.
#[derive(Debug)]
pub struct JwtValidator<S = JwksEndpoint> {
    resolver: KeyResolver<S>,
    issuer: String,
    algorithm: Algorithm,
    clock_skew_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl JwtValidator<JwksEndpoint> {
    pub fn new(config: &ClientConfig, settings: &SettingsConfig) -> Result<Self, ClientBuildError> {
        Self::with_clock(config, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &ClientConfig,
        settings: &SettingsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ClientBuildError> {
        let endpoints = Endpoints::resolve(config, settings.base_url.as_deref());
        let algorithm = parse_expected_algorithm(&settings.expected_algorithm)?;
        let source = JwksEndpoint::new(endpoints.jwks_url, build_http_client(settings)?, clock.clone());
        Ok(Self::from_parts(
            KeyResolver::new(source),
            endpoints.issuer,
            algorithm,
            settings.clock_skew_seconds,
            clock,
        ))
    }
}

impl<S: FetchKeySet> JwtValidator<S> {
    pub fn from_parts(
        resolver: KeyResolver<S>,
        issuer: String,
        algorithm: Algorithm,
        clock_skew_seconds: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { resolver, issuer, algorithm, clock_skew_seconds, clock }
    }

    pub fn extract_bearer_token<'a>(&self, authorization_header: Option<&'a str>) -> Result<&'a str, MissingTokenError> {
        extract_bearer_token(authorization_header)
    }

    pub async fn validate(&self, token: &str) -> Result<ValidationResult, FetchError> {
        let metrics = get_metrics();
        match self.check(token).await {
            Ok(Ok(payload)) => {
                metrics.validations.with_label_values(&["valid"]).inc();
                Ok(ValidationResult::Valid { payload })
            }
            Ok(Err(reason)) => {
                metrics.validations.with_label_values(&[reason.as_label()]).inc();
                debug!(reason = %reason, "token rejected");
                Ok(ValidationResult::Invalid { reason })
            }
            Err(e) => {
                metrics.validations.with_label_values(&["jwks_unavailable"]).inc();
                Err(e)
            }
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn resolver(&self) -> &KeyResolver<S> {
        &self.resolver
    }

    async fn check(&self, token: &str) -> Result<Result<JwtPayload, InvalidReason>, FetchError> {
        // 1. structure
        let parsed = match parse_token(token) {
            Ok(parsed) => parsed,
            Err(reason) => return Ok(Err(reason)),
        };

        // 2. algorithm policy, before any key lookup
        if parsed.header.alg.parse::<Algorithm>().ok() != Some(self.algorithm) {
            debug!(alg = %parsed.header.alg, "unexpected token algorithm");
            return Ok(Err(InvalidReason::UnexpectedAlgorithm));
        }

        // 3. key
        let Some(kid) = parsed.header.kid.as_deref() else {
            return Ok(Err(InvalidReason::UnknownKey));
        };
        let key = match self.resolver.resolve_key(kid).await {
            Ok(key) => key,
            Err(ResolveError::UnknownKey(_)) => return Ok(Err(InvalidReason::UnknownKey)),
            Err(ResolveError::Fetch(e)) => return Err(e),
        };

        // 4. signature only, claims are checked below with our own clock
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        if let Err(e) = decode::<serde_json::Value>(token, &key, &validation) {
            debug!(error = ?e.kind(), "signature verification failed");
            return Ok(Err(InvalidReason::BadSignature));
        }

        // 5. claims
        Ok(self.check_claims(parsed.payload))
    }

    fn check_claims(&self, payload: JwtPayload) -> Result<JwtPayload, InvalidReason> {
        let now = self.clock.now_unix();
        match payload.exp {
            Some(exp) if now <= exp.saturating_add(self.clock_skew_seconds as i64) => {}
            _ => return Err(InvalidReason::Expired),
        }
        if payload.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(InvalidReason::IssuerMismatch);
        }
        Ok(payload)
    }
}

fn parse_token(token: &str) -> Result<ParsedToken, InvalidReason> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        return Err(InvalidReason::Malformed);
    };

    let header: TokenHeader =
        serde_json::from_slice(&decode_segment(header)?).map_err(|_| InvalidReason::Malformed)?;
    let payload: JwtPayload =
        serde_json::from_slice(&decode_segment(payload)?).map_err(|_| InvalidReason::Malformed)?;
    decode_segment(signature)?;

    Ok(ParsedToken { header, payload })
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, InvalidReason> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| URL_SAFE.decode(segment))
        .map_err(|_| InvalidReason::Malformed)
}
