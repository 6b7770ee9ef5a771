//! # Conditions
//!
//! Read and write helpers for the condition list on a request's status.
//! A status holds at most one condition per type.

use crate::crd::{
    CertificateRequest, CertificateRequestStatus, Condition, ConditionStatus, CONDITION_READY,
    REASON_FAILED, REASON_ISSUED,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Condition of the given type, if present
pub fn get_condition<'a>(request: &'a CertificateRequest, condition_type: &str) -> Option<&'a Condition> {
    request
        .status
        .as_ref()
        .and_then(|status| status.conditions.iter().find(|c| c.r#type == condition_type))
}

/// Set a condition on the request, replacing any condition of the same type
///
/// `last_transition_time` becomes `now` when the condition is new or when its
/// status, reason or message changed. Rewriting an identical condition keeps
/// the existing timestamp.
pub fn set_condition(
    request: &mut CertificateRequest,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) {
    let mut condition = Condition::new(condition_type, status, reason, message);
    condition.last_transition_time = Some(now);

    let conditions = &mut request
        .status
        .get_or_insert_with(CertificateRequestStatus::default)
        .conditions;

    match conditions.iter_mut().find(|c| c.r#type == condition_type) {
        Some(existing) => {
            if existing.status == status && existing.reason == reason && existing.message == message {
                condition.last_transition_time = existing.last_transition_time;
            } else {
                debug!(
                    condition_type,
                    from = %existing,
                    to = %condition,
                    "Condition transitioned"
                );
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// Whether the request reached a state this controller does not move out of
/// on its own: issued, or terminally failed for the current spec generation
pub fn is_finished(request: &CertificateRequest) -> bool {
    let Some(ready) = get_condition(request, CONDITION_READY) else {
        return false;
    };
    if ready.reason != REASON_ISSUED && ready.reason != REASON_FAILED {
        return false;
    }
    let observed = request.status.as_ref().and_then(|s| s.observed_generation);
    observed.is_none() || observed == request.metadata.generation
}
