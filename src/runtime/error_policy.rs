//! # Error Policy
//!
//! Requeue decisions for failed reconciliations. Each request keeps its own
//! Fibonacci backoff so one failing request does not slow down the others.

use crate::constants;
use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::{resource_key, Reconciler, ReconcilerError};
use crate::crd::CertificateRequest;
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Requeue a failed request after its next backoff delay
pub fn handle_reconciliation_error(
    request: Arc<CertificateRequest>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = request.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = request.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::error_span!(
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {}", name, error);
    metrics::increment_reconciliation_errors();

    let (backoff_seconds, error_count) = next_error_backoff(
        &ctx.backoff_states,
        &resource_key(&request),
        ctx.config.backoff_min_minutes,
        ctx.config.backoff_max_minutes,
    );

    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {})",
        backoff_seconds, error_count
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Record an error for `resource_key` and return the delay before the next attempt
pub fn next_error_backoff(
    backoff_states: &Mutex<HashMap<String, BackoffState>>,
    resource_key: &str,
    min_minutes: u64,
    max_minutes: u64,
) -> (u64, u32) {
    match backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(resource_key.to_string())
                .or_insert_with(|| BackoffState::new(min_minutes, max_minutes));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (constants::DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, 0)
        }
    }
}

/// Drop the backoff entry for `resource_key` after a clean pass
///
/// The next error starts again from the minimum delay.
pub fn clear_backoff(backoff_states: &Mutex<HashMap<String, BackoffState>>, resource_key: &str) {
    match backoff_states.lock() {
        Ok(mut states) => {
            if let Some(state) = states.remove(resource_key) {
                if state.error_count > 0 {
                    debug!(resource_key, "Resetting error backoff after successful reconciliation");
                }
            }
        }
        Err(e) => warn!("Failed to lock backoff_states: {}", e),
    }
}
