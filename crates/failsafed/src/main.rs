//! Failsafe daemon - operational control plane.
//!
//! Owns the system state, serves the control socket, and drives timed
//! recovery.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use failsafed::auth::DigestVerifier;
use failsafed::config::{self, DEFAULT_CONFIG_PATH};
use failsafed::controller::Controller;
use failsafed::dispatch::{DirectiveSink, LoggingSink};
use failsafed::persist::StateStore;
use failsafed::rpc;
use failsafed::scheduler::RecoveryScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("failsafed v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("FAILSAFED_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = config::load_config(&config_path).await?;

    if config.credential_sha256.is_empty() {
        warn!("No administrator credential configured; all mutating calls will be rejected");
    }

    let store = StateStore::new(&config.data_dir);
    let verifier = Arc::new(DigestVerifier::new(config.credential_sha256.clone()));
    let sink: Arc<dyn DirectiveSink> = Arc::new(LoggingSink);

    let controller = Arc::new(
        Controller::restore(
            store,
            verifier,
            sink,
            config.require_reason,
            config.progressive_step_minutes,
        )
        .await,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = RecoveryScheduler::new(Arc::clone(&controller), shutdown_rx);
    let scheduler_handle = tokio::spawn(scheduler.run());

    let server_controller = Arc::clone(&controller);
    let socket_path = config.socket_path.clone();
    tokio::spawn(async move {
        if let Err(e) = rpc::start_server(server_controller, &socket_path).await {
            tracing::error!("RPC server failed: {e:#}");
        }
    });

    info!("failsafed ready");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;

    // final persistence pass so a clean shutdown loses nothing
    if let Err(e) = controller.flush().await {
        warn!("Final state flush failed: {e}");
    }

    Ok(())
}
