//! # Signing
//!
//! Drives one signing attempt for a request and classifies what went wrong:
//!
//! | Step          | Failure                  | Report  | Returned                 |
//! |---------------|--------------------------|---------|--------------------------|
//! | build client  | referenced Secret absent | Pending | `Ok(None)` (wait)        |
//! | build client  | anything else            | Pending | `Err` (backoff)          |
//! | sign          | issuer error             | Failed  | `Ok(None)` (terminal)    |
//! | sign          | -                        | -       | `Ok(Some(IssueResponse))` |

use super::error::ReconcilerError;
use super::reporter::Reporter;
use super::validation::certificate_duration;
use crate::crd::{CertificateRequest, VaultIssuer};
use crate::observability::metrics;
use crate::provider::{ClientBuilder, SecretLookup};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, Instrument};

/// Event reason when a Secret referenced by the issuer does not exist
pub const REASON_MISSING_SECRET: &str = "MissingSecret";

/// Event reason when the signing client could not be built for another reason
pub const REASON_ERROR_VAULT_INIT: &str = "ErrorVaultInit";

/// Event reason when Vault failed to sign the request
pub const REASON_ERROR_SIGNING: &str = "ErrorSigning";

/// Signed certificate and issuing CA for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueResponse {
    pub certificate: String,
    pub ca: String,
}

/// Signs certificate requests through a Vault issuer
#[derive(Clone)]
pub struct VaultSigner {
    reporter: Reporter,
    builder: Arc<dyn ClientBuilder>,
    secrets: Arc<dyn SecretLookup>,
}

impl std::fmt::Debug for VaultSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSigner")
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl VaultSigner {
    pub fn new(
        reporter: Reporter,
        builder: Arc<dyn ClientBuilder>,
        secrets: Arc<dyn SecretLookup>,
    ) -> Self {
        Self {
            reporter,
            builder,
            secrets,
        }
    }

    /// Attempt to sign `request` with `issuer`
    ///
    /// `Ok(None)` means there is nothing to return and nothing to retry with
    /// backoff; the reason is recorded on the request status. `Err` means the
    /// caller should retry with backoff.
    pub async fn sign(
        &self,
        request: &mut CertificateRequest,
        issuer: &VaultIssuer,
    ) -> Result<Option<IssueResponse>, ReconcilerError> {
        let span = tracing::info_span!(
            "controller.sign",
            resource.name = request.metadata.name.as_deref().unwrap_or("unknown"),
            issuer.name = issuer.metadata.name.as_deref().unwrap_or("unknown"),
        );
        self.sign_request(request, issuer).instrument(span).await
    }

    async fn sign_request(
        &self,
        request: &mut CertificateRequest,
        issuer: &VaultIssuer,
    ) -> Result<Option<IssueResponse>, ReconcilerError> {
        let namespace = request
            .metadata
            .namespace
            .clone()
            .ok_or(ReconcilerError::MissingMetadata("metadata.namespace"))?;

        let client = match self
            .builder
            .build(&namespace, self.secrets.as_ref(), issuer)
            .await
        {
            Ok(client) => client,
            Err(err) => {
                let kind = err.kind();
                metrics::increment_client_build_failures(kind.as_str());

                if kind.is_retryable() {
                    let message = "Failed to initialise vault client for signing";
                    self.reporter
                        .pending(request, &err, REASON_ERROR_VAULT_INIT, message);
                    error!(error = %err, "{}", message);
                    return Err(ReconcilerError::ClientInit(err));
                }

                // Missing dependency: wait for the Secret to appear
                let message = "Required secret resource not found";
                self.reporter
                    .pending(request, &err, REASON_MISSING_SECRET, message);
                error!(error = %err, "{}", message);
                return Ok(None);
            }
        };

        let duration = certificate_duration(request);
        metrics::increment_sign_requests();
        let started = Instant::now();
        let result = client.sign(request.spec.request.as_bytes(), duration).await;
        metrics::observe_sign_duration(started.elapsed().as_secs_f64());

        match result {
            Ok(signed) => {
                info!(duration_secs = duration.as_secs(), "certificate issued");
                metrics::increment_certificates_issued();
                Ok(Some(IssueResponse {
                    certificate: signed.certificate,
                    ca: signed.ca,
                }))
            }
            Err(err) => {
                let message = "Vault failed to sign certificate";
                metrics::increment_sign_errors();
                self.reporter
                    .failed(request, &err, REASON_ERROR_SIGNING, message);
                error!(error = %err, failure.kind = err.kind().as_str(), "{}", message);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::crd::{
        CertificateRequestSpec, IssuerRef, SecretKeySelector, VaultAuth, VaultIssuerSpec,
        CONDITION_READY, REASON_FAILED, REASON_PENDING,
    };
    use crate::events::RecordingEventPublisher;
    use crate::provider::{
        ClientBuildError, LookupError, SignedCertificate, SigningClient, SigningError,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::api::core::v1::Secret;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::super::conditions::get_condition;

    struct NoSecrets;

    #[async_trait]
    impl SecretLookup for NoSecrets {
        async fn get(&self, namespace: &str, name: &str) -> Result<Secret, LookupError> {
            Err(LookupError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
        }
    }

    enum Behaviour {
        MissingSecret,
        InitError,
        SignError,
        Sign,
    }

    struct FakeClient {
        behaviour: Arc<Behaviour>,
        durations: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl SigningClient for FakeClient {
        async fn sign(&self, csr: &[u8], duration: Duration) -> Result<SignedCertificate, SigningError> {
            self.durations.lock().unwrap().push(duration);
            match *self.behaviour {
                Behaviour::SignError => Err(SigningError::new("permission denied")),
                _ => Ok(SignedCertificate {
                    certificate: format!("signed:{}", String::from_utf8_lossy(csr)),
                    ca: "ca".to_string(),
                }),
            }
        }
    }

    struct FakeBuilder {
        behaviour: Arc<Behaviour>,
        durations: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl ClientBuilder for FakeBuilder {
        async fn build(
            &self,
            namespace: &str,
            _secrets: &dyn SecretLookup,
            _issuer: &VaultIssuer,
        ) -> Result<Box<dyn SigningClient>, ClientBuildError> {
            match *self.behaviour {
                Behaviour::MissingSecret => Err(ClientBuildError::MissingSecret {
                    namespace: namespace.to_string(),
                    name: "vault-token".to_string(),
                }),
                Behaviour::InitError => Err(ClientBuildError::init("invalid server URL")),
                _ => Ok(Box::new(FakeClient {
                    behaviour: Arc::clone(&self.behaviour),
                    durations: Arc::clone(&self.durations),
                })),
            }
        }
    }

    struct Fixture {
        signer: VaultSigner,
        events: RecordingEventPublisher,
        durations: Arc<Mutex<Vec<Duration>>>,
    }

    fn fixture(behaviour: Behaviour) -> Fixture {
        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        let events = RecordingEventPublisher::new();
        let durations = Arc::new(Mutex::new(Vec::new()));
        let reporter = Reporter::new(Arc::new(clock), Arc::new(events.clone()));
        let builder = FakeBuilder {
            behaviour: Arc::new(behaviour),
            durations: Arc::clone(&durations),
        };
        Fixture {
            signer: VaultSigner::new(reporter, Arc::new(builder), Arc::new(NoSecrets)),
            events,
            durations,
        }
    }

    fn request(duration: Option<&str>) -> CertificateRequest {
        let mut cr = CertificateRequest::new(
            "test",
            CertificateRequestSpec {
                request: "csr".to_string(),
                duration: duration.map(str::to_string),
                issuer_ref: IssuerRef {
                    name: "vault".to_string(),
                },
                is_ca: false,
            },
        );
        cr.metadata.namespace = Some("default".to_string());
        cr
    }

    fn issuer() -> VaultIssuer {
        let mut issuer = VaultIssuer::new(
            "vault",
            VaultIssuerSpec {
                server: "https://vault:8200".to_string(),
                path: "pki/sign/example".to_string(),
                ca_bundle: None,
                auth: VaultAuth {
                    token_secret_ref: Some(SecretKeySelector {
                        name: "vault-token".to_string(),
                        key: None,
                    }),
                    app_role: None,
                },
            },
        );
        issuer.metadata.namespace = Some("default".to_string());
        issuer
    }

    #[tokio::test]
    async fn test_missing_secret_is_pending_without_error() {
        let f = fixture(Behaviour::MissingSecret);
        let mut cr = request(None);

        let result = f.signer.sign(&mut cr, &issuer()).await.unwrap();

        assert!(result.is_none());
        let ready = get_condition(&cr, CONDITION_READY).unwrap();
        assert_eq!(ready.reason, REASON_PENDING);
        assert_eq!(
            ready.message,
            "Required secret resource not found: secrets \"vault-token\" not found in namespace \"default\""
        );
        assert_eq!(f.events.events().len(), 1);
        assert!(f.events.events()[0].starts_with("Normal MissingSecret "));
    }

    #[tokio::test]
    async fn test_init_error_is_pending_and_returned() {
        let f = fixture(Behaviour::InitError);
        let mut cr = request(None);

        let err = f.signer.sign(&mut cr, &issuer()).await.unwrap_err();

        assert!(matches!(err, ReconcilerError::ClientInit(_)));
        let ready = get_condition(&cr, CONDITION_READY).unwrap();
        assert_eq!(ready.reason, REASON_PENDING);
        assert_eq!(
            f.events.events(),
            vec!["Normal ErrorVaultInit Failed to initialise vault client for signing: invalid server URL"]
        );
        assert!(cr.status.as_ref().unwrap().failure_time.is_none());
    }

    #[tokio::test]
    async fn test_sign_error_is_terminal_failure() {
        let f = fixture(Behaviour::SignError);
        let mut cr = request(None);

        let result = f.signer.sign(&mut cr, &issuer()).await.unwrap();

        assert!(result.is_none());
        let ready = get_condition(&cr, CONDITION_READY).unwrap();
        assert_eq!(ready.reason, REASON_FAILED);
        assert_eq!(ready.message, "Vault failed to sign certificate: permission denied");
        assert_eq!(
            f.events.events(),
            vec!["Warning ErrorSigning Vault failed to sign certificate: permission denied"]
        );
        assert!(cr.status.as_ref().unwrap().failure_time.is_some());
    }

    #[tokio::test]
    async fn test_success_returns_bundle() {
        let f = fixture(Behaviour::Sign);
        let mut cr = request(Some("24h"));

        let response = f.signer.sign(&mut cr, &issuer()).await.unwrap().unwrap();

        assert_eq!(response.certificate, "signed:csr");
        assert_eq!(response.ca, "ca");
        assert!(cr.status.is_none());
        assert!(f.events.events().is_empty());
        assert_eq!(*f.durations.lock().unwrap(), vec![Duration::from_secs(86400)]);
    }

    #[tokio::test]
    async fn test_default_duration_used_when_unset() {
        let f = fixture(Behaviour::Sign);
        let mut cr = request(None);

        f.signer.sign(&mut cr, &issuer()).await.unwrap();

        assert_eq!(
            *f.durations.lock().unwrap(),
            vec![Duration::from_secs(crate::constants::DEFAULT_CERT_DURATION_SECS)]
        );
    }

    #[tokio::test]
    async fn test_repeated_missing_secret_notifies_once() {
        let f = fixture(Behaviour::MissingSecret);
        let mut cr = request(None);

        for _ in 0..3 {
            f.signer.sign(&mut cr, &issuer()).await.unwrap();
        }

        assert_eq!(f.events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_namespace_is_error() {
        let f = fixture(Behaviour::Sign);
        let mut cr = request(None);
        cr.metadata.namespace = None;

        let err = f.signer.sign(&mut cr, &issuer()).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::MissingMetadata(_)));
    }
}
