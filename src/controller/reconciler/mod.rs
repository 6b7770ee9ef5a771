//! # Reconciler
//!
//! Reconciles `CertificateRequest` resources against their `VaultIssuer`.
//!
//! One pass:
//! 1. skip requests already issued or terminally failed for the current generation
//! 2. resolve the referenced issuer in the request namespace
//! 3. sign, recording Pending/Failed/Issued on the status
//! 4. persist the status if it changed
//! 5. map the outcome onto a requeue action
//!
//! Errors returned from [`reconcile`] go through the Fibonacci error policy.

pub mod conditions;
mod error;
pub mod reporter;
pub mod sign;
pub mod status;
pub mod validation;

pub use error::ReconcilerError;
pub use reporter::Reporter;
pub use sign::{IssueResponse, VaultSigner};

use crate::clock::SystemClock;
use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::crd::{
    CertificateRequest, CertificateRequestStatus, VaultIssuer, CONDITION_READY, REASON_FAILED,
};
use crate::events::KubeEventPublisher;
use crate::observability::metrics;
use crate::provider::{ClientBuilder, KubeSecretLookup};
use conditions::{get_condition, is_finished};
use kube::{Api, Client};
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

/// Event reason when the referenced issuer does not exist
pub const REASON_ISSUER_NOT_FOUND: &str = "IssuerNotFound";

/// Result of one reconcile pass that did not error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do for the current generation
    Skipped,
    /// Certificate stored on the request
    Issued,
    /// Signing failed terminally
    Failed,
    /// Waiting on a dependency; retried on the next resync
    Pending,
}

impl Outcome {
    /// Requeue policy for this outcome
    pub fn action(self, resync_interval: Duration) -> Action {
        match self {
            Outcome::Skipped | Outcome::Issued | Outcome::Failed => Action::await_change(),
            Outcome::Pending => {
                metrics::increment_requeues_total("resync");
                Action::requeue(resync_interval)
            }
        }
    }
}

/// Shared context handed to every reconcile call
pub struct Reconciler {
    pub client: Client,
    pub signer: VaultSigner,
    pub reporter: Reporter,
    pub config: ControllerConfig,
    /// Per-request error backoff, keyed by `namespace/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Wire up the production collaborators around `builder`
    pub fn new(client: Client, config: ControllerConfig, builder: Arc<dyn ClientBuilder>) -> Self {
        let events = KubeEventPublisher::new(client.clone(), &config.controller_name);
        let reporter = Reporter::new(Arc::new(SystemClock), Arc::new(events));
        let secrets = KubeSecretLookup::new(client.clone());
        let signer = VaultSigner::new(reporter.clone(), builder, Arc::new(secrets));
        Self::with_parts(client, config, reporter, signer)
    }

    pub fn with_parts(
        client: Client,
        config: ControllerConfig,
        reporter: Reporter,
        signer: VaultSigner,
    ) -> Self {
        Self {
            client,
            signer,
            reporter,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Forget accumulated errors for a request after a clean pass
    pub fn reset_backoff(&self, resource_key: &str) {
        crate::runtime::error_policy::clear_backoff(&self.backoff_states, resource_key);
    }
}

/// Key identifying a request in the backoff map
pub fn resource_key(request: &CertificateRequest) -> String {
    format!(
        "{}/{}",
        request.metadata.namespace.as_deref().unwrap_or("default"),
        request.metadata.name.as_deref().unwrap_or("unknown")
    )
}

/// Reconcile one request
pub async fn reconcile(
    request: Arc<CertificateRequest>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.name = request.metadata.name.as_deref().unwrap_or("unknown"),
        resource.namespace = request.metadata.namespace.as_deref().unwrap_or("unknown"),
        resource.generation = request.metadata.generation.unwrap_or(0),
    );
    reconcile_request(request, ctx).instrument(span).await
}

async fn reconcile_request(
    request: Arc<CertificateRequest>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let started = Instant::now();
    metrics::increment_reconciliations();

    let namespace = request
        .metadata
        .namespace
        .as_deref()
        .ok_or(ReconcilerError::MissingMetadata("metadata.namespace"))?;

    if is_finished(&request) {
        debug!("Skipping reconciliation - request already finished for this generation");
        return Ok(Outcome::Skipped.action(ctx.config.resync_interval()));
    }

    let issuer = Api::<VaultIssuer>::namespaced(ctx.client.clone(), namespace)
        .get_opt(&request.spec.issuer_ref.name)
        .await?;

    let mut updated = (*request).clone();
    let result = process_request(&ctx.signer, &ctx.reporter, &mut updated, issuer.as_ref()).await;

    let generation = updated.metadata.generation;
    updated
        .status
        .get_or_insert_with(CertificateRequestStatus::default)
        .observed_generation = generation;

    let persisted =
        status::persist_status(&ctx.client, &ctx.config.controller_name, &request, &updated).await;
    metrics::observe_reconciliation_duration(started.elapsed().as_secs_f64());

    match (result, persisted) {
        (Err(e), Err(persist_err)) => {
            warn!(error = %persist_err, "Failed to persist status after reconciliation error");
            Err(e)
        }
        (Err(e), Ok(_)) => Err(e),
        (Ok(_), Err(persist_err)) => Err(persist_err),
        (Ok(outcome), Ok(_)) => {
            ctx.reset_backoff(&resource_key(&request));
            info!(outcome = ?outcome, "Reconciliation complete");
            Ok(outcome.action(ctx.config.resync_interval()))
        }
    }
}

/// Sign `request` with `issuer` and record the result on its status
///
/// `issuer` is `None` when the referenced issuer does not exist; the request
/// is then left Pending.
pub async fn process_request(
    signer: &VaultSigner,
    reporter: &Reporter,
    request: &mut CertificateRequest,
    issuer: Option<&VaultIssuer>,
) -> Result<Outcome, ReconcilerError> {
    let Some(issuer) = issuer else {
        let cause = format!(
            "vaultissuers \"{}\" not found in namespace \"{}\"",
            request.spec.issuer_ref.name,
            request.metadata.namespace.as_deref().unwrap_or("default")
        );
        reporter.pending(request, cause, REASON_ISSUER_NOT_FOUND, "Referenced issuer not found");
        return Ok(Outcome::Pending);
    };

    match signer.sign(request, issuer).await? {
        Some(response) => {
            reporter.issued(request, response.certificate, response.ca);
            Ok(Outcome::Issued)
        }
        None if get_condition(request, CONDITION_READY)
            .is_some_and(|ready| ready.reason == REASON_FAILED) =>
        {
            Ok(Outcome::Failed)
        }
        None => Ok(Outcome::Pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::crd::{
        CertificateRequestSpec, IssuerRef, SecretKeySelector, VaultAuth, VaultIssuerSpec,
        REASON_ISSUED, REASON_PENDING,
    };
    use crate::events::RecordingEventPublisher;
    use crate::provider::{
        ClientBuildError, LookupError, SecretLookup, SignedCertificate, SigningClient,
        SigningError,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::api::core::v1::Secret;

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

    struct StaticClient {
        fail: bool,
    }

    #[async_trait]
    impl SigningClient for StaticClient {
        async fn sign(&self, _csr: &[u8], _duration: Duration) -> Result<SignedCertificate, SigningError> {
            if self.fail {
                return Err(SigningError::new("role not permitted"));
            }
            Ok(SignedCertificate {
                certificate: "cert".to_string(),
                ca: "ca".to_string(),
            })
        }
    }

    struct StaticBuilder {
        fail_sign: bool,
    }

    #[async_trait]
    impl ClientBuilder for StaticBuilder {
        async fn build(
            &self,
            _namespace: &str,
            _secrets: &dyn SecretLookup,
            _issuer: &VaultIssuer,
        ) -> Result<Box<dyn SigningClient>, ClientBuildError> {
            Ok(Box::new(StaticClient {
                fail: self.fail_sign,
            }))
        }
    }

    fn parts(fail_sign: bool) -> (VaultSigner, Reporter, RecordingEventPublisher) {
        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let events = RecordingEventPublisher::new();
        let reporter = Reporter::new(Arc::new(clock), Arc::new(events.clone()));
        let signer = VaultSigner::new(
            reporter.clone(),
            Arc::new(StaticBuilder { fail_sign }),
            Arc::new(NoSecrets),
        );
        (signer, reporter, events)
    }

    fn request() -> CertificateRequest {
        let mut cr = CertificateRequest::new(
            "web",
            CertificateRequestSpec {
                request: "csr".to_string(),
                duration: None,
                issuer_ref: IssuerRef {
                    name: "vault".to_string(),
                },
                is_ca: false,
            },
        );
        cr.metadata.namespace = Some("apps".to_string());
        cr
    }

    fn issuer() -> VaultIssuer {
        VaultIssuer::new(
            "vault",
            VaultIssuerSpec {
                server: "https://vault:8200".to_string(),
                path: "pki/sign/web".to_string(),
                ca_bundle: None,
                auth: VaultAuth {
                    token_secret_ref: Some(SecretKeySelector {
                        name: "token".to_string(),
                        key: None,
                    }),
                    app_role: None,
                },
            },
        )
    }

    #[tokio::test]
    async fn test_missing_issuer_is_pending() {
        let (signer, reporter, events) = parts(false);
        let mut cr = request();

        let outcome = process_request(&signer, &reporter, &mut cr, None).await.unwrap();

        assert_eq!(outcome, Outcome::Pending);
        let ready = get_condition(&cr, CONDITION_READY).unwrap();
        assert_eq!(ready.reason, REASON_PENDING);
        assert_eq!(
            ready.message,
            "Referenced issuer not found: vaultissuers \"vault\" not found in namespace \"apps\""
        );
        assert!(events.events()[0].starts_with("Normal IssuerNotFound "));
    }

    #[tokio::test]
    async fn test_issued_outcome_records_certificate() {
        let (signer, reporter, events) = parts(false);
        let mut cr = request();

        let outcome = process_request(&signer, &reporter, &mut cr, Some(&issuer()))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Issued);
        let status = cr.status.as_ref().unwrap();
        assert_eq!(status.certificate.as_deref(), Some("cert"));
        assert_eq!(status.ca.as_deref(), Some("ca"));
        assert_eq!(get_condition(&cr, CONDITION_READY).unwrap().reason, REASON_ISSUED);
        assert_eq!(
            events.events(),
            vec!["Normal CertificateIssued Certificate fetched from issuer successfully"]
        );
    }

    #[tokio::test]
    async fn test_signing_failure_is_terminal() {
        let (signer, reporter, _) = parts(true);
        let mut cr = request();

        let outcome = process_request(&signer, &reporter, &mut cr, Some(&issuer()))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Failed);
        assert!(is_finished(&cr));
    }

    #[test]
    fn test_outcome_actions() {
        let resync = Duration::from_secs(60);
        assert_eq!(Outcome::Issued.action(resync), Action::await_change());
        assert_eq!(Outcome::Failed.action(resync), Action::await_change());
        assert_eq!(Outcome::Skipped.action(resync), Action::await_change());
        assert_eq!(Outcome::Pending.action(resync), Action::requeue(resync));
    }

    #[test]
    fn test_pending_with_zero_resync_still_waits() {
        let config = ControllerConfig {
            resync_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            Outcome::Pending.action(config.resync_interval()),
            Action::requeue(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_resource_key() {
        assert_eq!(resource_key(&request()), "apps/web");
    }
}
