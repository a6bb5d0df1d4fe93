//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and reconciler setup.

use crate::config::{load_config, ServerConfig};
use crate::constants;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use crate::runtime::watch_loop::ControllerContext;
use crate::store::KubeCredentialStore;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, Client};
use std::sync::Arc;
use tracing::{error, info};

/// Components needed by the secret controller
#[derive(Debug)]
pub struct InitializationResult {
    /// Secrets API, cluster-wide or scoped to `WATCH_NAMESPACE`
    pub secrets: Api<Secret>,
    /// Controller context (reconciler and retry state)
    pub context: Arc<ControllerContext>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

/// Install the tracing subscriber with `RUST_LOG`, falling back to `default_filter`
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

/// Install the ring crypto provider for rustls
///
/// An error only means another component installed a provider first.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    install_crypto_provider();
    init_tracing(constants::DEFAULT_LOG_FILTER);

    info!("Starting Provider Credential Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let (controller_config, server_config) = load_config();
    info!("Controller configuration: {:?}", controller_config);

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let secrets: Api<Secret> = match &controller_config.watch_namespace {
        Some(namespace) => {
            info!("Watching credential secrets in namespace {}", namespace);
            Api::namespaced(client.clone(), namespace)
        }
        None => Api::all(client.clone()),
    };

    let store = Arc::new(KubeCredentialStore::new(client));
    let reconciler = Arc::new(Reconciler::new(store, controller_config));
    let context = Arc::new(ControllerContext::new(reconciler));

    info!("Controller initialized, starting secret controller...");

    Ok(InitializationResult {
        secrets,
        context,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state
            .is_ready
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
