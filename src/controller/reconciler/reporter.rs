//! # Status Reporter
//!
//! Writes the `Ready` condition for Pending/Failed outcomes and decides whether
//! the transition deserves a Kubernetes event.
//!
//! Reconciliation runs on every tick, so reporting is idempotent:
//! - a Pending report only emits an event when the request was not already Pending
//! - a Failed report always emits a Warning event
//! - `failureTime` records the first failure and is never moved afterwards
//!
//! Only the in-memory status is mutated; persisting it is the caller's job.

use crate::clock::Clock;
use crate::crd::{
    CertificateRequest, CertificateRequestStatus, ConditionStatus, CONDITION_READY,
    REASON_FAILED, REASON_ISSUED, REASON_PENDING,
};
use crate::events::EventPublisher;
use crate::observability::metrics;
use kube::Resource;
use kube::runtime::events::EventType;
use std::fmt::Display;
use std::sync::Arc;

use super::conditions::{get_condition, set_condition};

/// Event reason emitted when a certificate is stored on the request
pub const EVENT_REASON_ISSUED: &str = "CertificateIssued";

/// Reports Pending/Failed/Issued state onto a request
#[derive(Clone)]
pub struct Reporter {
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn new(clock: Arc<dyn Clock>, events: Arc<dyn EventPublisher>) -> Self {
        Self { clock, events }
    }

    /// Mark the request Pending
    ///
    /// Emits a Normal event with `reason` unless the existing `Ready` condition
    /// is already Pending. Never touches `failureTime`.
    pub fn pending(
        &self,
        request: &mut CertificateRequest,
        cause: impl Display,
        reason: &str,
        message: &str,
    ) {
        let message = format!("{message}: {cause}");

        let already_pending = get_condition(request, CONDITION_READY)
            .is_some_and(|ready| ready.reason == REASON_PENDING);
        if !already_pending {
            self.publish(request, EventType::Normal, reason, &message);
        }

        set_condition(
            request,
            CONDITION_READY,
            ConditionStatus::False,
            REASON_PENDING,
            &message,
            self.clock.now(),
        );
        metrics::increment_status_reports(REASON_PENDING, reason);
    }

    /// Mark the request Failed
    ///
    /// Always emits a Warning event with `reason`. Sets `failureTime` to now
    /// only if it is not already set.
    pub fn failed(
        &self,
        request: &mut CertificateRequest,
        cause: impl Display,
        reason: &str,
        message: &str,
    ) {
        let message = format!("{message}: {cause}");

        self.publish(request, EventType::Warning, reason, &message);

        let now = self.clock.now();
        set_condition(
            request,
            CONDITION_READY,
            ConditionStatus::False,
            REASON_FAILED,
            &message,
            now,
        );

        let status = request
            .status
            .get_or_insert_with(CertificateRequestStatus::default);
        if status.failure_time.is_none() {
            status.failure_time = Some(now);
        }
        metrics::increment_status_reports(REASON_FAILED, reason);
    }

    /// Store the signed certificate and mark the request Ready
    pub fn issued(&self, request: &mut CertificateRequest, certificate: String, ca: String) {
        let message = "Certificate fetched from issuer successfully";

        let status = request
            .status
            .get_or_insert_with(CertificateRequestStatus::default);
        status.certificate = Some(certificate);
        status.ca = Some(ca);

        set_condition(
            request,
            CONDITION_READY,
            ConditionStatus::True,
            REASON_ISSUED,
            message,
            self.clock.now(),
        );
        self.publish(request, EventType::Normal, EVENT_REASON_ISSUED, message);
    }

    fn publish(&self, request: &CertificateRequest, type_: EventType, reason: &str, note: &str) {
        let resource_ref = request.object_ref(&());
        self.events.publish(&resource_ref, type_, reason, note);
    }
}
