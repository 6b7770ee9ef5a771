//! # Watch Loop
//!
//! Runs the kube controller over `CertificateRequest` resources until a
//! shutdown signal arrives. Changes to a `VaultIssuer` requeue every request in
//! the same namespace that references it, so requests waiting on an issuer do
//! not have to wait for the next resync.

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{CertificateRequest, VaultIssuer};
use crate::runtime::error_policy::handle_reconciliation_error;
use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Requests in the issuer's namespace that reference it by name
pub fn requests_for_issuer(
    requests: &[Arc<CertificateRequest>],
    issuer: &VaultIssuer,
) -> Vec<ObjectRef<CertificateRequest>> {
    let issuer_name = issuer.name_any();
    let issuer_namespace = issuer.namespace();
    requests
        .iter()
        .filter(|request| {
            request.namespace() == issuer_namespace && request.spec.issuer_ref.name == issuer_name
        })
        .map(|request| ObjectRef::from_obj(request.as_ref()))
        .collect()
}

/// Run the controller until shutdown
pub async fn run_watch_loop(
    requests: Api<CertificateRequest>,
    issuers: Api<VaultIssuer>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) {
    let concurrency = reconciler.config.max_concurrent_reconciliations;
    info!(concurrency, "Starting controller watch loop...");

    let controller = Controller::new(requests, watcher::Config::default().any_semantic())
        .with_config(controller::Config::default().concurrency(concurrency));
    let store: Store<CertificateRequest> = controller.store();

    controller
        .watches(issuers, watcher::Config::default(), move |issuer| {
            requests_for_issuer(&store.state(), &issuer)
        })
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!(resource = %object, ?action, "watch.event.success");
                }
                Err(e) => {
                    warn!(error = %e, "Controller stream error");
                }
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller stopped gracefully");
}
