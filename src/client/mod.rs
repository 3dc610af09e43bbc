//! M2M token clients.
//!
//! `engine` holds the cache and single-flight logic once; `blocking` and
//! `non_blocking` only differ in how callers wait for it.

use std::time::Duration;

use reqwest::Client;

use crate::config::settings::SettingsConfig;

pub mod blocking;
pub mod engine;
pub mod non_blocking;

pub(crate) fn build_http_client(settings: &SettingsConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_millis(settings.http_timeout_ms))
        .build()
}
