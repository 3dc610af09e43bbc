use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::{Arc, OnceLock};
use tracing::info;

// Process-wide registry; clients and validators are still constructed and owned explicitly.
static METRICS_INSTANCE: OnceLock<Arc<Metrics>> = OnceLock::new();

/// Lazily initializes and returns the process-wide metrics.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| {
        info!("Initializing Metrics ...");
        Metrics::new()
    })
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token client metrics
    pub token_fetch_requests: IntCounterVec,
    pub token_fetch_failures: IntCounterVec,
    pub token_fetch_duration: HistogramVec,
    pub token_cache_hits: IntCounterVec,
    pub token_clears: IntCounterVec,

    // Key resolver metrics
    pub jwks_fetch_requests: IntCounter,
    pub jwks_fetch_failures: IntCounterVec,
    pub jwks_keys: IntGauge,

    // Validator metrics
    pub validations: IntCounterVec,

    // Config
    pub config_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("m2mauth".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token client
            token_fetch_requests: IntCounterVec::new(Opts::new("token_fetch_requests_total", "Token endpoint calls by client variant"), &["client"]).unwrap(),
            token_fetch_failures: IntCounterVec::new(Opts::new("token_fetch_failures_total", "Token endpoint failures by reason"), &["client", "reason"]).unwrap(),
            token_fetch_duration: HistogramVec::new(HistogramOpts::new("token_fetch_duration_seconds", "Token fetch duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["client"]).unwrap(),
            token_cache_hits: IntCounterVec::new(Opts::new("token_cache_hits_total", "get_token calls served from cache"), &["client"]).unwrap(),
            token_clears: IntCounterVec::new(Opts::new("token_clears_total", "Explicit token invalidations"), &["client"]).unwrap(),

            // Key resolver
            jwks_fetch_requests: IntCounter::new("jwks_fetch_requests_total", "JWKS endpoint calls").unwrap(),
            jwks_fetch_failures: IntCounterVec::new(Opts::new("jwks_fetch_failures_total", "JWKS fetch failures by reason"), &["reason"]).unwrap(),
            jwks_keys: IntGauge::new("jwks_keys_cached", "Keys in the most recently fetched JWKS").unwrap(),

            // Validator
            validations: IntCounterVec::new(Opts::new("token_validations_total", "Inbound token validations by outcome"), &["outcome"]).unwrap(),

            config_errors: IntCounter::new("config_errors_total", "Config parse/validation errors").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_fetch_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.token_clears.clone())).unwrap();
        reg.register(Box::new(metrics.jwks_fetch_requests.clone())).unwrap();
        reg.register(Box::new(metrics.jwks_fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.jwks_keys.clone())).unwrap();
        reg.register(Box::new(metrics.validations.clone())).unwrap();
        reg.register(Box::new(metrics.config_errors.clone())).unwrap();

        metrics
    }
}
