//! Configuration consumed by the auth layer: client credentials, derived
//! endpoints, and the YAML service settings.

pub mod client_config;
pub mod loader;
pub mod settings;
