//! # Vault Signing Collaborators
//!
//! Seams between the signer and the Vault PKI backend:
//!
//! - [`ClientBuilder`] - turns a `VaultIssuer` plus namespace Secrets into a client
//! - [`SigningClient`] - signs a CSR for a validity duration
//! - [`SecretLookup`] - namespaced Secret access used while building a client
//!
//! The transport to Vault is supplied by the embedding binary through these traits.

mod error;
mod secrets;

pub use error::{ClientBuildError, FailureKind, LookupError, SigningError};
pub use secrets::{resolve_secret_value, KubeSecretLookup, SecretLookup};

use crate::crd::VaultIssuer;
use async_trait::async_trait;
use std::time::Duration;

/// PEM material returned by a successful signing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCertificate {
    /// Signed certificate
    pub certificate: String,
    /// Certificate of the issuing authority
    pub ca: String,
}

/// A client able to sign certificate requests against one issuer
#[async_trait]
pub trait SigningClient: Send + Sync {
    /// Sign `csr` (PEM bytes) for `duration`
    async fn sign(&self, csr: &[u8], duration: Duration) -> Result<SignedCertificate, SigningError>;
}

/// Builds a [`SigningClient`] for an issuer
///
/// Must return [`ClientBuildError::MissingSecret`] when a referenced Secret does
/// not exist, so the signer can wait for it instead of backing off.
#[async_trait]
pub trait ClientBuilder: Send + Sync {
    async fn build(
        &self,
        namespace: &str,
        secrets: &dyn SecretLookup,
        issuer: &VaultIssuer,
    ) -> Result<Box<dyn SigningClient>, ClientBuildError>;
}
