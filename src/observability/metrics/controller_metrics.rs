//! # Controller Metrics
//!
//! Metrics for controller operations: reconciliations, status reports, events and requeues.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

// Controller reconciliation metrics
static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_request_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "certificate_request_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "certificate_request_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

// Status reporting metrics
static STATUS_REPORTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certificate_request_status_reports_total",
            "Total number of Pending/Failed status reports written to requests",
        ),
        &["state", "reason"],
    )
    .expect("Failed to create STATUS_REPORTS_TOTAL metric - this should never happen")
});

static EVENTS_EMITTED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certificate_request_events_emitted_total",
            "Total number of Kubernetes events emitted for certificate requests",
        ),
        &["type", "reason"],
    )
    .expect("Failed to create EVENTS_EMITTED_TOTAL metric - this should never happen")
});

// Requeue metrics
static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "certificate_request_requeues_total",
            "Total number of reconciliation requeues",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(STATUS_REPORTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENTS_EMITTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

// Public functions for controller metrics

/// Count one reconcile call, whatever its outcome
pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

/// Count one reconcile call that returned an error to the error policy
pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

/// Record how long one reconcile call took
///
/// # Arguments
/// * `duration` - Elapsed wall time in seconds
pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

/// Count a Pending or Failed report written onto a request
///
/// # Arguments
/// * `state` - `Ready` condition reason written (`Pending` or `Failed`)
/// * `reason` - Caller-supplied reason carried on the event
///
/// # Example
/// ```rust
/// use certificate_request_controller::observability::metrics;
///
/// metrics::increment_status_reports("Pending", "MissingSecret");
/// ```
pub fn increment_status_reports(state: &str, reason: &str) {
    STATUS_REPORTS_TOTAL
        .with_label_values(&[state, reason])
        .inc();
}

/// Count a Kubernetes event published for a request
///
/// # Arguments
/// * `event_type` - `Normal` or `Warning`
/// * `reason` - Event reason
pub fn increment_events_emitted(event_type: &str, reason: &str) {
    EVENTS_EMITTED_TOTAL
        .with_label_values(&[event_type, reason])
        .inc();
}

/// Count a requeue scheduled by the controller
///
/// # Arguments
/// * `reason` - `resync` for Pending requests, `error-backoff` for failed reconciles
pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        let after = RECONCILIATIONS_TOTAL.get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL.get();
        increment_reconciliation_errors();
        let after = RECONCILIATION_ERRORS_TOTAL.get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration(1.5);
        // Just verify it doesn't panic - histogram observation doesn't return a value
    }

    #[test]
    fn test_events_emitted_labelled_by_type_and_reason() {
        let counter = EVENTS_EMITTED_TOTAL.with_label_values(&["Warning", "MetricsTestReason"]);
        let before = counter.get();
        increment_events_emitted("Warning", "MetricsTestReason");
        assert_eq!(counter.get(), before + 1u64);
    }

    #[test]
    fn test_requeues_labelled_by_reason() {
        let counter = REQUEUES_TOTAL.with_label_values(&["metrics-test"]);
        let before = counter.get();
        increment_requeues_total("metrics-test");
        increment_requeues_total("metrics-test");
        assert_eq!(counter.get(), before + 2u64);
    }
}
