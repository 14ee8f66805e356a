//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::store::ObjectKey;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace of the OpenStack root credentials secret
    pub secret_namespace: String,
    /// Name of the OpenStack root credentials secret
    pub secret_name: String,
    /// Secret data key holding `clouds.yaml`
    pub clouds_secret_key: String,
    /// Path the CA bundle is mounted at; `cacert` in `clouds.yaml` is rewritten to it
    pub ca_cert_path: String,
    /// Namespace of the cloud credential operator (legacy ConfigMap lookup)
    pub operator_namespace: String,
    /// Name of the legacy ConfigMap carrying `disabled: "true"`
    pub legacy_config_map_name: String,
    /// Name of the cluster-scoped `CloudCredential` operator config
    pub operator_config_name: String,
    /// Name of the cluster-scoped `Infrastructure` object
    pub infrastructure_name: String,
    /// Port for metrics and health probes
    pub metrics_port: u16,
    /// Default log level when `RUST_LOG` is not set (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// First backoff step after a failed reconciliation (seconds)
    pub backoff_min_secs: u64,
    /// Maximum backoff between retries of a failed reconciliation (seconds)
    pub backoff_max_secs: u64,
    /// Periodic resync after a successful reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Delay before restarting the watch stream after it ends (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            secret_namespace: DEFAULT_SECRET_NAMESPACE.to_string(),
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            clouds_secret_key: DEFAULT_CLOUDS_SECRET_KEY.to_string(),
            ca_cert_path: DEFAULT_CA_CERT_PATH.to_string(),
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            legacy_config_map_name: DEFAULT_LEGACY_CONFIG_MAP_NAME.to_string(),
            operator_config_name: DEFAULT_CLUSTER_OBJECT_NAME.to_string(),
            infrastructure_name: DEFAULT_CLUSTER_OBJECT_NAME.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, falling back to defaults
    ///
    /// Values that fail to parse are ignored in favour of the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let parsed = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            secret_namespace: string("SECRET_NAMESPACE", defaults.secret_namespace),
            secret_name: string("SECRET_NAME", defaults.secret_name),
            clouds_secret_key: string("CLOUDS_SECRET_KEY", defaults.clouds_secret_key),
            ca_cert_path: string("CA_CERT_PATH", defaults.ca_cert_path),
            operator_namespace: string("OPERATOR_NAMESPACE", defaults.operator_namespace),
            legacy_config_map_name: string(
                "LEGACY_CONFIG_MAP_NAME",
                defaults.legacy_config_map_name,
            ),
            operator_config_name: string("OPERATOR_CONFIG_NAME", defaults.operator_config_name),
            infrastructure_name: string("INFRASTRUCTURE_NAME", defaults.infrastructure_name),
            metrics_port: lookup("METRICS_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.metrics_port),
            log_level: string("LOG_LEVEL", defaults.log_level),
            backoff_min_secs: parsed("BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: parsed("BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            resync_interval_secs: parsed("RESYNC_INTERVAL_SECS", defaults.resync_interval_secs),
            watch_restart_delay_secs: parsed(
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
        }
    }

    /// Key of the credentials secret this controller owns
    #[must_use]
    pub fn secret_key(&self) -> ObjectKey {
        ObjectKey::namespaced(&self.secret_namespace, &self.secret_name)
    }

    /// Key of the legacy "disable the operator" ConfigMap
    #[must_use]
    pub fn legacy_config_map_key(&self) -> ObjectKey {
        ObjectKey::namespaced(&self.operator_namespace, &self.legacy_config_map_name)
    }

    /// Key of the cluster-scoped `CloudCredential` operator config
    #[must_use]
    pub fn operator_config_key(&self) -> ObjectKey {
        ObjectKey::cluster(&self.operator_config_name)
    }

    /// Key of the cluster-scoped `Infrastructure` object
    #[must_use]
    pub fn infrastructure_key(&self) -> ObjectKey {
        ObjectKey::cluster(&self.infrastructure_name)
    }

    /// Get resync interval duration
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ControllerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.secret_key().to_string(), "kube-system/openstack-credentials");
        assert_eq!(
            config.legacy_config_map_key().to_string(),
            "openshift-cloud-credential-operator/cloud-credential-operator-config"
        );
        assert_eq!(config.operator_config_key().to_string(), "cluster");
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("SECRET_NAMESPACE", "openstack"),
            ("SECRET_NAME", "root-creds"),
            ("CA_CERT_PATH", "/etc/pki/ca.pem"),
            ("METRICS_PORT", "9090"),
            ("BACKOFF_MAX_SECS", "60"),
        ]));
        assert_eq!(config.secret_key().to_string(), "openstack/root-creds");
        assert_eq!(config.ca_cert_path, "/etc/pki/ca.pem");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.backoff_max_secs, 60);
        assert_eq!(config.backoff_min_secs, crate::constants::DEFAULT_BACKOFF_MIN_SECS);
    }

    #[test]
    fn test_unparsable_numbers_fall_back_to_defaults() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("METRICS_PORT", "not-a-port"),
            ("RESYNC_INTERVAL_SECS", "-1"),
        ]));
        assert_eq!(config.metrics_port, crate::constants::DEFAULT_METRICS_PORT);
        assert_eq!(
            config.resync_interval(),
            Duration::from_secs(crate::constants::DEFAULT_RESYNC_INTERVAL_SECS)
        );
    }
}
