//! # Provider Credential Controller
//!
//! Watches provider credential secrets and propagates changes to their copies.
//! See the library crate for the moving parts.

use anyhow::Result;
use provider_credential_controller::runtime::initialization::initialize;
use provider_credential_controller::runtime::watch_loop::run_controller;
use std::sync::atomic::Ordering;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    let outcome = tokio::select! {
        result = run_controller(init_result.secrets, init_result.context) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
            Ok(())
        }
    };

    // Fail readiness while the process winds down
    init_result.server_state.is_ready.store(false, Ordering::Relaxed);
    outcome
}
