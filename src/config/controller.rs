//! # Controller Settings
//!
//! Reconcile loop tuning: identity, resync, backoff and concurrency.

use super::env_var_or_default;
use crate::constants::*;
use crate::observability::DEFAULT_LOG_FILTER;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Name reported on Events and used as the status field manager
    pub controller_name: String,
    /// Requeue delay for requests left Pending without an error (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff floor for reconciliation errors (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff ceiling for reconciliation errors (minutes)
    pub backoff_max_minutes: u64,
    /// Upper bound on reconciliations running at the same time
    pub max_concurrent_reconciliations: u16,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let controller_name = std::env::var("CONTROLLER_NAME")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTROLLER_NAME.to_string());

        Self {
            controller_name,
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            log_filter: std::env::var("LOG_FILTER")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Delay before a Pending request is reconciled again, at least one second
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }
}
