//! # OpenStack Secret Annotator
//!
//! Kubernetes controller for the OpenStack root credentials secret
//! (`kube-system/openstack-credentials` by default). On every change to the
//! secret, the `CloudCredential` operator config or the legacy operator
//! ConfigMap it:
//!
//! 1. Resolves the cloud credentials mode and records it in the
//!    `cloudcredential.openshift.io/mode` annotation
//! 2. Rewrites `clouds.openstack.cacert` in `clouds.yaml` to the mounted CA bundle path
//!
//! Configuration comes from environment variables (see `ControllerConfig`).

use anyhow::{Context, Result};
use clap::Parser;
use openstack_secret_annotator::config::ControllerConfig;
use openstack_secret_annotator::runtime::{initialization, watch_loop};
use tracing::info;

/// OpenStack root credentials secret annotator
#[derive(Debug, Parser)]
#[command(name = "openstack-secret-annotator", version, about, long_about = None)]
struct Args {
    /// Reconcile the secret once and exit
    #[arg(long)]
    once: bool,

    /// Port for metrics and health probes (overrides METRICS_PORT)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ControllerConfig::from_env();
    if let Some(port) = args.metrics_port {
        config.metrics_port = port;
    }

    if args.once {
        return run_once(config).await;
    }

    let init = initialization::initialize(config).await?;
    if init.platform_supported {
        watch_loop::run_watch_loop(init.client, init.reconciler, init.server_state).await
    } else {
        watch_loop::run_idle(init.server_state).await
    }
}

async fn run_once(config: ControllerConfig) -> Result<()> {
    initialization::install_crypto_provider();
    initialization::init_tracing(&config.log_level);
    initialization::log_build_info();

    let key = config.secret_key();
    let (_client, reconciler) = initialization::create_reconciler(config).await?;

    if !reconciler.annotator.platform_supported().await? {
        info!("Cluster platform is not OpenStack, nothing to do");
        return Ok(());
    }

    let outcome = reconciler
        .annotator
        .reconcile(&key)
        .await
        .with_context(|| format!("Failed to reconcile secret {key}"))?;
    info!("Reconciled {}: {:?}", key, outcome);
    Ok(())
}
