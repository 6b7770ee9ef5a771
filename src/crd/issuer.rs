//! # VaultIssuer
//!
//! Issuer configuration handed to the signing client builder.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VaultIssuer Custom Resource Definition
///
/// ```yaml
/// apiVersion: vault.certificates.io/v1alpha1
/// kind: VaultIssuer
/// metadata:
///   name: vault-issuer
///   namespace: default
/// spec:
///   server: https://vault.example.com:8200
///   path: pki_int/sign/example-dot-com
///   auth:
///     tokenSecretRef:
///       name: vault-token
///       key: token
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[kube(
    kind = "VaultIssuer",
    group = "vault.certificates.io",
    version = "v1alpha1",
    namespaced,
    shortname = "vi"
)]
#[serde(rename_all = "camelCase")]
pub struct VaultIssuerSpec {
    /// Vault server address
    pub server: String,
    /// Mount path of the PKI signing role (e.g. `pki_int/sign/example-dot-com`)
    pub path: String,
    /// PEM bundle used to verify the Vault server certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
    /// How the controller authenticates to Vault
    pub auth: VaultAuth,
}

/// Vault authentication
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultAuth {
    /// Secret holding a Vault token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret_ref: Option<SecretKeySelector>,
    /// AppRole login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_role: Option<VaultAppRole>,
}

/// AppRole credentials; the secret id is read from a Secret
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultAppRole {
    /// Mount path of the AppRole auth backend
    #[serde(default = "default_app_role_path")]
    pub path: String,
    pub role_id: String,
    pub secret_ref: SecretKeySelector,
}

/// Key within a Secret in the issuer namespace
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
}

fn default_app_role_path() -> String {
    "approle".to_string()
}

impl VaultAuth {
    /// The Secret this auth method depends on, if any
    pub fn secret_ref(&self) -> Option<&SecretKeySelector> {
        self.token_secret_ref
            .as_ref()
            .or_else(|| self.app_role.as_ref().map(|a| &a.secret_ref))
    }
}
