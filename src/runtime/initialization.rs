//! # Initialization
//!
//! Brings up the process-wide pieces before the watch loop starts: rustls
//! crypto provider, tracing, metrics, the HTTP server and the Kubernetes
//! client.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::{CertificateRequest, VaultIssuer};
use crate::observability;
use crate::provider::ClientBuilder;
use anyhow::{Context, Result};
use kube::{api::Api, Client};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    /// CertificateRequests in all namespaces
    pub requests: Api<CertificateRequest>,
    /// VaultIssuers in all namespaces
    pub issuers: Api<VaultIssuer>,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// `builder` supplies signing clients for `VaultIssuer` resources.
pub async fn initialize(
    controller_config: ControllerConfig,
    server_config: ServerConfig,
    builder: Arc<dyn ClientBuilder>,
) -> Result<InitializationResult> {
    // rustls 0.23 needs a process-wide provider before any TLS connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    observability::init_tracing(&controller_config.log_filter);
    info!(
        controller = controller_config.controller_name.as_str(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting certificate request controller"
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_config, &server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let requests: Api<CertificateRequest> = Api::all(client.clone());
    let issuers: Api<VaultIssuer> = Api::all(client.clone());
    let reconciler = Arc::new(Reconciler::new(client.clone(), controller_config, builder));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        requests,
        issuers,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to bind
async fn wait_for_server_ready(
    config: &ServerConfig,
    server_state: &ServerState,
    server_handle: &JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = config.startup_timeout();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(config.poll_interval()).await;
    }
}
