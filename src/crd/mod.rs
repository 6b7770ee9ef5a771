//! # Custom Resource Definitions
//!
//! CRD types for the certificate request controller.
//!
//! - `CertificateRequest` - a CSR waiting to be signed, and the status this controller reports on it
//! - `VaultIssuer` - connection details for the Vault PKI backend that signs requests

mod issuer;
mod status;

pub use issuer::*;
pub use status::*;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// CertificateRequest Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.certificates.io/v1alpha1
/// kind: CertificateRequest
/// metadata:
///   name: my-service-tls
///   namespace: default
/// spec:
///   request: |
///     -----BEGIN CERTIFICATE REQUEST-----
///     ...
///     -----END CERTIFICATE REQUEST-----
///   duration: 2160h
///   issuerRef:
///     name: vault-issuer
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[kube(
    kind = "CertificateRequest",
    group = "vault.certificates.io",
    version = "v1alpha1",
    namespaced,
    status = "CertificateRequestStatus",
    shortname = "cr",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Reason", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].reason"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestSpec {
    /// PEM encoded certificate signing request
    pub request: String,
    /// Requested certificate validity
    /// Format: Kubernetes duration string (e.g., "2160h", "90d", "30m")
    /// Default: 90 days when unset or zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Issuer that should sign this request
    pub issuer_ref: IssuerRef,
    /// Request a CA certificate
    #[serde(default, rename = "isCA")]
    pub is_ca: bool,
}

/// Reference to a `VaultIssuer` in the request namespace
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    pub name: String,
}
