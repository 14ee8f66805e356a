//! # Reconciler
//!
//! Glue between `kube_runtime::Controller` and [`SecretAnnotator`]. The
//! annotator makes the decisions; this module adds metrics, per-object backoff
//! bookkeeping and the requeue policy.

use crate::annotator::{AnnotatorError, ReconcileOutcome, SecretAnnotator};
use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::observability::metrics;
use crate::store::{KubeStore, ObjectKey, ObjectStore};
use k8s_openapi::api::core::v1::Secret;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] AnnotatorError),
}

impl ReconcilerError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::ReconciliationFailed(e) => e.reason(),
        }
    }
}

/// Shared controller context
#[derive(Debug)]
pub struct Reconciler<S = KubeStore> {
    pub annotator: SecretAnnotator<S>,
    /// Per-object retry state, keyed by `namespace/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: S, config: ControllerConfig) -> Self {
        Self {
            annotator: SecretAnnotator::new(store, config),
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        self.annotator.config()
    }

    /// Advance the backoff for `key`; returns the delay and the consecutive error count
    pub fn next_backoff(&self, key: &ObjectKey) -> (u64, u32) {
        let config = self.config();
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(key.to_string())
                    .or_insert_with(|| {
                        BackoffState::new(config.backoff_min_secs, config.backoff_max_secs)
                    });
                state.increment_error();
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(e) => {
                warn!(
                    "Failed to lock backoff_states: {}, using default backoff",
                    e
                );
                (config.backoff_min_secs, 0)
            }
        }
    }

    pub fn reset_backoff(&self, key: &ObjectKey) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                if let Some(state) = states.get_mut(&key.to_string()) {
                    state.reset();
                }
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }
}

/// Reconcile one secret event and schedule the next resync
pub async fn reconcile<S: ObjectStore>(
    secret: Arc<Secret>,
    ctx: Arc<Reconciler<S>>,
) -> Result<Action, ReconcilerError> {
    let key = ObjectKey::of(secret.as_ref());
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.name = key.name.as_str(),
        resource.namespace = key.namespace.as_deref().unwrap_or(""),
        resource.version = secret.metadata.resource_version.as_deref().unwrap_or("unknown")
    );

    let start = Instant::now();
    metrics::increment_reconciliations();
    let result = ctx.annotator.reconcile(&key).instrument(span).await;
    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    let outcome = result?;
    ctx.reset_backoff(&key);

    match outcome {
        ReconcileOutcome::Updated { .. } => info!("Reconciled {}: {:?}", key, outcome),
        _ => debug!("Reconciled {}: {:?}", key, outcome),
    }

    let resync = ctx.config().resync_interval();
    debug!(
        "Next resync of {} in {}s (trigger source: timer-based)",
        key,
        resync.as_secs()
    );
    metrics::increment_requeues_total("timer-based");
    Ok(Action::requeue(resync))
}
