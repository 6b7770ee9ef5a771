//! # Observability
//!
//! Logging and metrics setup.

pub mod metrics;

use tracing::warn;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "certificate_request_controller=info";

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured filter. Installing twice is
/// not an error (an embedding binary may have set its own subscriber already).
pub fn init_tracing(filter: &str) {
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .try_init()
    {
        warn!("Tracing subscriber already initialized: {}", e);
    }
}
