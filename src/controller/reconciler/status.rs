//! # Status Persistence
//!
//! Writes a request's status back to the API server with a merge patch on the
//! status subresource. Unchanged statuses are not written, so a reconcile that
//! changes nothing does not trigger another watch event.

use super::error::ReconcilerError;
use crate::crd::{CertificateRequest, CertificateRequestStatus};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use tracing::debug;

/// Whether reconciliation changed the status of `before`
pub fn status_changed(before: &CertificateRequest, after: &CertificateRequest) -> bool {
    before.status != after.status
}

/// Merge patch body replacing the request status
pub fn status_patch(status: &CertificateRequestStatus) -> Result<serde_json::Value, ReconcilerError> {
    Ok(serde_json::json!({ "status": serde_json::to_value(status)? }))
}

/// Persist the status of `after` if it differs from `before`
///
/// Returns whether a patch was sent. A request deleted while it was being
/// reconciled is not an error.
pub async fn persist_status(
    client: &Client,
    field_manager: &str,
    before: &CertificateRequest,
    after: &CertificateRequest,
) -> Result<bool, ReconcilerError> {
    let name = after
        .metadata
        .name
        .as_deref()
        .ok_or(ReconcilerError::MissingMetadata("metadata.name"))?;
    let namespace = after
        .metadata
        .namespace
        .as_deref()
        .ok_or(ReconcilerError::MissingMetadata("metadata.namespace"))?;

    let Some(status) = after.status.as_ref() else {
        return Ok(false);
    };
    if !status_changed(before, after) {
        debug!(
            resource.name = name,
            resource.namespace = namespace,
            "Skipping status update - status unchanged"
        );
        return Ok(false);
    }

    let api: Api<CertificateRequest> = Api::namespaced(client.clone(), namespace);
    let patch = status_patch(status)?;

    match api
        .patch_status(name, &PatchParams::apply(field_manager), &Patch::Merge(patch))
        .await
    {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!(
                "CertificateRequest {}/{} was deleted during reconciliation, skipping status update",
                namespace, name
            );
            Ok(false)
        }
        Err(e) => Err(ReconcilerError::Kube(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        CertificateRequestSpec, Condition, ConditionStatus, IssuerRef, CONDITION_READY,
        REASON_PENDING,
    };

    fn request() -> CertificateRequest {
        CertificateRequest::new(
            "test",
            CertificateRequestSpec {
                request: "csr".to_string(),
                duration: None,
                issuer_ref: IssuerRef {
                    name: "vault".to_string(),
                },
                is_ca: false,
            },
        )
    }

    #[test]
    fn test_status_changed() {
        let before = request();
        let mut after = before.clone();
        assert!(!status_changed(&before, &after));

        after.status = Some(CertificateRequestStatus {
            observed_generation: Some(1),
            ..Default::default()
        });
        assert!(status_changed(&before, &after));
    }

    #[test]
    fn test_status_patch_shape() {
        let status = CertificateRequestStatus {
            conditions: vec![Condition::new(
                CONDITION_READY,
                ConditionStatus::False,
                REASON_PENDING,
                "waiting",
            )],
            certificate: Some("cert".to_string()),
            ..Default::default()
        };

        let patch = status_patch(&status).unwrap();

        assert_eq!(patch["status"]["conditions"][0]["type"], "Ready");
        assert_eq!(patch["status"]["conditions"][0]["status"], "False");
        assert_eq!(patch["status"]["certificate"], "cert");
        assert!(patch["status"].get("failureTime").is_none());
    }
}
