//! # Watch Loop
//!
//! Watches the credentials secret, plus the objects its mode is derived from,
//! and reconciles the secret whenever any of them changes.

use crate::constants::MODE_ANNOTATION;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::CloudCredential;
use crate::runtime::error_policy::{
    handle_reconciliation_error, handle_watch_stream_error, WatchErrorKind,
};
use crate::store::KubeStore;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::Api;
use kube::Client;
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves once SIGINT or SIGTERM is received
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Mark the server not ready once a shutdown signal arrives
fn spawn_shutdown_watcher(server_state: Arc<ServerState>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        server_state.set_ready(false);
    });
}

/// Serve probes without watching anything, until shutdown
pub async fn run_idle(server_state: Arc<ServerState>) -> Result<(), anyhow::Error> {
    server_state.set_ready(true);
    info!("Idle: cluster platform is not OpenStack");
    shutdown_signal().await;
    server_state.set_ready(false);
    info!("Controller stopped gracefully");
    Ok(())
}

/// Run the controller watch loop, restarting the stream when it ends
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let config = reconciler.config().clone();
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &config.secret_namespace);
    let operator_configs: Api<CloudCredential> = Api::all(client.clone());
    let legacy_config_maps: Api<ConfigMap> =
        Api::namespaced(client.clone(), &config.operator_namespace);

    server_state.set_ready(true);
    spawn_shutdown_watcher(Arc::clone(&server_state));

    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        info!(
            "Starting controller watch on secret {} (annotation {})",
            config.secret_key(),
            MODE_ANNOTATION
        );

        let secret_name = config.secret_name.clone();
        let secret_namespace = config.secret_namespace.clone();
        let to_secret = move || {
            Some(ObjectRef::<Secret>::new(&secret_name).within(&secret_namespace))
        };
        let to_secret_from_config_map = to_secret.clone();
        let watch_restart_delay = config.watch_restart_delay();

        Controller::new(
            secrets.clone(),
            watcher::Config::default().fields(&format!("metadata.name={}", config.secret_name)),
        )
        .watches(
            operator_configs.clone(),
            watcher::Config::default()
                .fields(&format!("metadata.name={}", config.operator_config_name)),
            move |_: CloudCredential| to_secret(),
        )
        .watches(
            legacy_config_maps.clone(),
            watcher::Config::default()
                .fields(&format!("metadata.name={}", config.legacy_config_map_name)),
            move |_: ConfigMap| to_secret_from_config_map(),
        )
        .shutdown_on_signal()
        .run(
            reconcile::<KubeStore>,
            handle_reconciliation_error::<KubeStore>,
            Arc::clone(&reconciler),
        )
        .filter_map(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!("watch.event.reconciled {} {:?}", object.name, action);
                    Some(())
                }
                Err(e) => {
                    let kind = WatchErrorKind::from_controller_error(&e);
                    handle_watch_stream_error(kind, &format!("{e:?}"), watch_restart_delay)
                        .await
                        .then_some(())
                }
            }
        })
        .for_each(|()| futures::future::ready(()))
        .await;

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            watch_restart_delay.as_secs()
        );
        // The shutdown watcher may still be flipping readiness after a signal
        tokio::time::sleep(watch_restart_delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}
