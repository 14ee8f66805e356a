//! # Secret Reconciliation
//!
//! Brings the OpenStack root credentials secret in line with the declared
//! credentials mode and the canonical CA bundle path.
//!
//! ## Reconciliation Flow
//!
//! 1. Fetch the credentials secret (absent: nothing to do)
//! 2. Fetch the legacy ConfigMap and the `CloudCredential` operator config
//! 3. Resolve the credentials mode
//! 4. Normalize the `cacert` path in `clouds.yaml`
//! 5. Compute the mode annotation
//! 6. Write the secret once, and only if something changed
//!
//! Any error aborts before step 6, so the secret is never partially updated.

use super::clouds::normalize_ca_cert;
use super::error::AnnotatorError;
use super::mode::{legacy_disabled, resolve, OperatingMode};
use crate::config::ControllerConfig;
use crate::constants::{MODE_ANNOTATION, OPENSTACK_PLATFORM_TYPE};
use crate::crd::{CloudCredential, Infrastructure};
use crate::observability::metrics;
use crate::store::{ObjectKey, ObjectStore};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// What a reconciliation did to the credentials secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The request named an object other than the managed secret
    Ignored,
    /// The secret does not exist
    SecretNotFound,
    /// The secret already matched; nothing was written
    Unchanged,
    /// The secret was written once
    Updated {
        annotation_changed: bool,
        payload_changed: bool,
    },
}

/// Annotates the credentials secret through an [`ObjectStore`]
#[derive(Debug, Clone)]
pub struct SecretAnnotator<S> {
    store: S,
    config: ControllerConfig,
}

impl<S: ObjectStore> SecretAnnotator<S> {
    pub fn new(store: S, config: ControllerConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Reconcile the secret named by `request`
    pub async fn reconcile(&self, request: &ObjectKey) -> Result<ReconcileOutcome, AnnotatorError> {
        let target = self.config.secret_key();
        if *request != target {
            debug!("Ignoring request for {}, only {} is managed", request, target);
            return Ok(ReconcileOutcome::Ignored);
        }

        let Some(mut secret) = self.store.get::<Secret>(&target).await? else {
            info!("Secret {} not found, nothing to reconcile", target);
            return Ok(ReconcileOutcome::SecretNotFound);
        };

        let mode = self.resolve_mode().await?;
        let payload_changed = self.normalize_payload(&mut secret)?;
        let annotation_changed = apply_mode_annotation(&mut secret, &mode);

        if !payload_changed && !annotation_changed {
            debug!("Secret {} is up to date (mode {})", target, mode);
            return Ok(ReconcileOutcome::Unchanged);
        }

        self.store
            .update(&secret)
            .await
            .map_err(|source| AnnotatorError::PersistenceFailure {
                secret: target.to_string(),
                source,
            })?;

        metrics::increment_secret_updates();
        if payload_changed {
            metrics::increment_ca_cert_fixes();
        }
        info!(
            secret.namespace = target.namespace.as_deref().unwrap_or(""),
            secret.name = target.name.as_str(),
            mode = %mode,
            annotation_changed,
            payload_changed,
            "Updated credentials secret"
        );

        Ok(ReconcileOutcome::Updated {
            annotation_changed,
            payload_changed,
        })
    }

    /// Whether the cluster runs on OpenStack according to `Infrastructure`
    ///
    /// A missing `Infrastructure` object is treated as "not OpenStack".
    pub async fn platform_supported(&self) -> Result<bool, AnnotatorError> {
        let key = self.config.infrastructure_key();
        let Some(infrastructure) = self.store.get::<Infrastructure>(&key).await? else {
            warn!("Infrastructure {} not found, cannot determine platform", key);
            return Ok(false);
        };

        let platform = infrastructure.platform_type();
        debug!("Cluster platform: {:?}", platform);
        Ok(platform == Some(OPENSTACK_PLATFORM_TYPE))
    }

    async fn resolve_mode(&self) -> Result<OperatingMode, AnnotatorError> {
        let legacy = self
            .store
            .get::<ConfigMap>(&self.config.legacy_config_map_key())
            .await?;
        let legacy_disabled = legacy_disabled(legacy.as_ref());

        let operator_config = self
            .store
            .get::<CloudCredential>(&self.config.operator_config_key())
            .await?;
        let declared_mode = match &operator_config {
            Some(config) => config.spec.credentials_mode.as_str(),
            None => {
                debug!(
                    "CloudCredential {} not found, treating credentials mode as unset",
                    self.config.operator_config_key()
                );
                ""
            }
        };

        let mode = resolve(declared_mode, legacy_disabled)?;
        debug!(
            declared_mode,
            legacy_disabled,
            "Resolved credentials mode {}", mode
        );
        Ok(mode)
    }

    /// Rewrite `cacert` in the secret's `clouds.yaml`; returns whether it changed
    fn normalize_payload(&self, secret: &mut Secret) -> Result<bool, AnnotatorError> {
        let key = &self.config.clouds_secret_key;
        let rewritten = {
            let Some(payload) = secret.data.as_ref().and_then(|data| data.get(key)) else {
                warn!(
                    "Secret {} has no {:?} key, skipping CA certificate check",
                    self.config.secret_key(),
                    key
                );
                return Ok(false);
            };

            let normalized = normalize_ca_cert(&payload.0, &self.config.ca_cert_path)?;
            if !normalized.changed {
                return Ok(false);
            }
            normalized.payload.into_owned()
        };

        info!(
            "Rewriting cacert in {:?} of secret {} to {}",
            key,
            self.config.secret_key(),
            self.config.ca_cert_path
        );
        secret
            .data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.clone(), ByteString(rewritten));
        Ok(true)
    }
}

/// Set or clear the mode annotation; returns whether the secret changed
pub fn apply_mode_annotation(secret: &mut Secret, mode: &OperatingMode) -> bool {
    let annotations = &mut secret.metadata.annotations;
    match mode.annotation_value() {
        Some(value) => {
            let current = annotations
                .as_ref()
                .and_then(|map| map.get(MODE_ANNOTATION))
                .map(String::as_str);
            if current == Some(value) {
                return false;
            }
            annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(MODE_ANNOTATION.to_string(), value.to_string());
            true
        }
        None => annotations
            .as_mut()
            .is_some_and(|map| map.remove(MODE_ANNOTATION).is_some()),
    }
}
