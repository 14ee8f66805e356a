//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Object names and paths follow the layout of an OpenShift cluster installed
//! on OpenStack. Most of them can be overridden via environment variables
//! (see [`crate::config::ControllerConfig`]).

/// Annotation recording the resolved credentials mode on the root secret
pub const MODE_ANNOTATION: &str = "cloudcredential.openshift.io/mode";

/// Namespace holding the OpenStack root credentials secret
pub const DEFAULT_SECRET_NAMESPACE: &str = "kube-system";

/// Name of the OpenStack root credentials secret
pub const DEFAULT_SECRET_NAME: &str = "openstack-credentials";

/// Secret data key holding the `clouds.yaml` document
pub const DEFAULT_CLOUDS_SECRET_KEY: &str = "clouds.yaml";

/// Path at which the CA bundle is mounted for consumers of `clouds.yaml`
pub const DEFAULT_CA_CERT_PATH: &str =
    "/etc/kubernetes/static-pod-resources/configmaps/cloud-config/ca-bundle.pem";

/// Namespace of the cloud credential operator
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "openshift-cloud-credential-operator";

/// Legacy ConfigMap that could disable the operator before `CloudCredential` existed
pub const DEFAULT_LEGACY_CONFIG_MAP_NAME: &str = "cloud-credential-operator-config";

/// Data key in the legacy ConfigMap
pub const LEGACY_DISABLED_KEY: &str = "disabled";

/// Name of the cluster-scoped `CloudCredential` and `Infrastructure` singletons
pub const DEFAULT_CLUSTER_OBJECT_NAME: &str = "cluster";

/// Platform type reported by `Infrastructure` on OpenStack clusters
pub const OPENSTACK_PLATFORM_TYPE: &str = "OpenStack";

/// Field manager / controller name used in logs and events
pub const CONTROLLER_NAME: &str = "openstack-secret-annotator";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default first backoff step after a reconciliation error (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default upper bound for the reconciliation error backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default periodic resync interval after a successful reconciliation (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
