//! # Initialization
//!
//! rustls setup, tracing, metrics, HTTP server and Kubernetes client.

use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{self, ServerState};
use crate::observability;
use crate::store::KubeStore;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Components needed by the watch loop
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    /// Whether the cluster runs on OpenStack; the watch loop idles otherwise
    pub platform_supported: bool,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("platform_supported", &self.platform_supported)
            .finish_non_exhaustive()
    }
}

/// Install the ring crypto provider for rustls
///
/// Must run before any Kubernetes client is created.
pub fn install_crypto_provider() {
    // Err only means a provider is already installed
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Set up the tracing subscriber
///
/// `RUST_LOG` wins; otherwise `log_level` applies to this crate.
pub fn init_tracing(log_level: &str) {
    let fallback = format!(
        "{}={}",
        env!("CARGO_CRATE_NAME"),
        log_level.to_lowercase()
    );
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .try_init();
}

pub fn log_build_info() {
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
}

/// Create the Kubernetes client and the reconciler context
pub async fn create_reconciler(config: ControllerConfig) -> Result<(Client, Arc<Reconciler>)> {
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let reconciler = Arc::new(Reconciler::new(KubeStore::new(client.clone()), config));
    Ok((client, reconciler))
}

/// Initialize the controller runtime
pub async fn initialize(config: ControllerConfig) -> Result<InitializationResult> {
    install_crypto_provider();
    init_tracing(&config.log_level);

    info!("Starting OpenStack secret annotator");
    log_build_info();
    info!(
        "Managing secret {} (cacert path {})",
        config.secret_key(),
        config.ca_cert_path
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    // Bind before spawning so a busy port fails startup
    let server_state = Arc::new(ServerState::new());
    let listener = server::bind(config.metrics_port)
        .await
        .with_context(|| format!("Failed to bind metrics port {}", config.metrics_port))?;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = server::serve(listener, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let (client, reconciler) = create_reconciler(config).await?;

    let platform_supported = reconciler
        .annotator
        .platform_supported()
        .await
        .context("Failed to determine cluster platform")?;
    if !platform_supported {
        info!("Cluster platform is not OpenStack, annotator will stay idle");
    }

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        platform_supported,
    })
}
