//! # Runtime
//!
//! Process lifecycle for the controller: initialization, the watch loop and
//! the error policy applied to failed reconciliations.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;

use crate::config;
use crate::provider::ClientBuilder;
use std::sync::Arc;

/// Load configuration from the environment and run the controller until shutdown
///
/// `builder` is the Vault transport supplied by the embedding binary.
pub async fn run(builder: Arc<dyn ClientBuilder>) -> anyhow::Result<()> {
    let (controller_config, server_config) = config::load_config();
    let InitializationResult {
        requests,
        issuers,
        reconciler,
        server_state,
        ..
    } = initialize(controller_config, server_config, builder).await?;

    run_watch_loop(requests, issuers, reconciler, server_state).await;
    Ok(())
}
