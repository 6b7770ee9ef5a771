//! # Signing Error Types
//!
//! Error types for signing-client construction and signing calls, with
//! classification into the failure kinds the signer branches on.

use thiserror::Error;

/// Failure kind of one signing attempt
///
/// Each kind carries its own retry policy:
/// - `MissingDependency` - wait for the dependency to appear (watch/resync), no backoff
/// - `Construction` - retry with backoff
/// - `Signing` - terminal, no automatic retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingDependency,
    Construction,
    Signing,
}

impl FailureKind {
    /// Whether the caller should retry this failure with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Construction)
    }

    /// Label used in metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingDependency => "missing_dependency",
            FailureKind::Construction => "construction",
            FailureKind::Signing => "signing",
        }
    }
}

/// Failure looking up a Secret
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("secrets \"{name}\" not found in namespace \"{namespace}\"")]
    NotFound { namespace: String, name: String },
    #[error("failed to read secret {namespace}/{name}: {source}")]
    Api {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

/// Failure constructing a signing client
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// A Secret the issuer references does not exist (yet)
    #[error("secrets \"{name}\" not found in namespace \"{namespace}\"")]
    MissingSecret { namespace: String, name: String },
    /// Any other construction failure (bad configuration, unreachable backend, ...)
    #[error("{0}")]
    Init(String),
}

impl ClientBuildError {
    /// Build an initialisation error from any displayable cause
    pub fn init(cause: impl std::fmt::Display) -> Self {
        ClientBuildError::Init(cause.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientBuildError::MissingSecret { .. })
    }

    pub fn kind(&self) -> FailureKind {
        if self.is_not_found() {
            FailureKind::MissingDependency
        } else {
            FailureKind::Construction
        }
    }
}

impl From<LookupError> for ClientBuildError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound { namespace, name } => {
                ClientBuildError::MissingSecret { namespace, name }
            }
            other @ LookupError::Api { .. } => ClientBuildError::init(other),
        }
    }
}

/// The issuer rejected or failed to sign a request
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SigningError {
    pub message: String,
}

impl SigningError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        FailureKind::Signing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_secret_is_missing_dependency() {
        let err = ClientBuildError::MissingSecret {
            namespace: "default".to_string(),
            name: "vault-token".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.kind(), FailureKind::MissingDependency);
        assert!(!err.kind().is_retryable());
        assert_eq!(
            err.to_string(),
            "secrets \"vault-token\" not found in namespace \"default\""
        );
    }

    #[test]
    fn test_init_error_is_construction() {
        let err = ClientBuildError::init("invalid server URL");
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), FailureKind::Construction);
        assert!(err.kind().is_retryable());
        assert_eq!(err.to_string(), "invalid server URL");
    }

    #[test]
    fn test_lookup_not_found_converts_to_missing_secret() {
        let err: ClientBuildError = LookupError::NotFound {
            namespace: "ns".to_string(),
            name: "s".to_string(),
        }
        .into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_signing_error_is_terminal() {
        let err = SigningError::new("permission denied");
        assert_eq!(err.kind(), FailureKind::Signing);
        assert!(!err.kind().is_retryable());
        assert_eq!(err.to_string(), "permission denied");
    }
}
