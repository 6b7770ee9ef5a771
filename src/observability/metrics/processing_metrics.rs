//! # Processing Metrics
//!
//! Metrics for signing operations: client construction, Vault signing calls,
//! issued certificates and duration parsing.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

// Duration parsing errors
static DURATION_PARSING_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_request_duration_parsing_errors_total",
        "Total number of spec.duration parsing failures (default duration used instead)",
    )
    .expect("Failed to create DURATION_PARSING_ERRORS_TOTAL metric - this should never happen")
});

// Client construction metrics
static CLIENT_BUILD_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certificate_request_client_build_failures_total",
            "Total number of signing client construction failures by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create CLIENT_BUILD_FAILURES_TOTAL metric - this should never happen")
});

// Signing metrics
static SIGN_REQUESTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_request_sign_requests_total",
        "Total number of signing requests sent to the issuer",
    )
    .expect("Failed to create SIGN_REQUESTS_TOTAL metric - this should never happen")
});

static SIGN_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_request_sign_errors_total",
        "Total number of signing requests rejected or failed by the issuer",
    )
    .expect("Failed to create SIGN_ERRORS_TOTAL metric - this should never happen")
});

static SIGN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "certificate_request_sign_duration_seconds",
            "Duration of signing calls in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .expect("Failed to create SIGN_DURATION metric - this should never happen")
});

static CERTIFICATES_ISSUED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_request_certificates_issued_total",
        "Total number of certificates issued",
    )
    .expect("Failed to create CERTIFICATES_ISSUED_TOTAL metric - this should never happen")
});

/// Register processing metrics with the registry
pub(crate) fn register_processing_metrics() -> Result<()> {
    REGISTRY.register(Box::new(DURATION_PARSING_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CLIENT_BUILD_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIGN_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIGN_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIGN_DURATION.clone()))?;
    REGISTRY.register(Box::new(CERTIFICATES_ISSUED_TOTAL.clone()))?;
    Ok(())
}

/// Count a `spec.duration` that could not be parsed and fell back to the default
pub fn increment_duration_parsing_errors() {
    DURATION_PARSING_ERRORS_TOTAL.inc();
}

/// Count a failed signing-client construction
///
/// # Arguments
/// * `kind` - Failure kind label, see `FailureKind::as_str`
///
/// # Example
/// ```rust
/// use certificate_request_controller::observability::metrics;
/// use certificate_request_controller::provider::FailureKind;
///
/// metrics::increment_client_build_failures(FailureKind::MissingDependency.as_str());
/// ```
pub fn increment_client_build_failures(kind: &str) {
    CLIENT_BUILD_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

/// Count a signing call sent to the issuer
pub fn increment_sign_requests() {
    SIGN_REQUESTS_TOTAL.inc();
}

pub fn increment_sign_errors() {
    SIGN_ERRORS_TOTAL.inc();
}

/// Record the latency of one signing call
///
/// # Arguments
/// * `duration` - Elapsed wall time in seconds, including failed calls
pub fn observe_sign_duration(duration: f64) {
    SIGN_DURATION.observe(duration);
}

pub fn increment_certificates_issued() {
    CERTIFICATES_ISSUED_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_sign_requests() {
        let before = SIGN_REQUESTS_TOTAL.get();
        increment_sign_requests();
        assert_eq!(SIGN_REQUESTS_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_client_build_failures_by_kind() {
        let counter = CLIENT_BUILD_FAILURES_TOTAL.with_label_values(&["missing_dependency"]);
        let before = counter.get();
        increment_client_build_failures("missing_dependency");
        assert_eq!(counter.get(), before + 1u64);
    }
}
