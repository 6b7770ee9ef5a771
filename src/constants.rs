//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default name reported as the event source and field manager
pub const DEFAULT_CONTROLLER_NAME: &str = "certificaterequests-issuer-vault";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default certificate validity when a request does not ask for one (90 days)
pub const DEFAULT_CERT_DURATION_SECS: u64 = 90 * 24 * 60 * 60;

/// Default periodic resync for requests left pending without an error (seconds)
/// Pending requests do not consume backoff budget, so this is what re-triggers them
/// when no watch event arrives
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60;

/// Default Fibonacci backoff floor for reconciliation errors (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Default Fibonacci backoff ceiling for reconciliation errors (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Fallback requeue when the backoff state cannot be read (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default upper bound on reconciliations running at the same time
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 4;
