//! # Controller Configuration
//!
//! Settings loaded from environment variables (populated from a ConfigMap via
//! `envFrom` in the deployment). Every setting has a default in `constants`.
//! Unparsable values fall back to the default.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

/// Load both configuration sections from the environment
pub fn load_config() -> (ControllerConfig, ServerConfig) {
    (ControllerConfig::from_env(), ServerConfig::from_env())
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
