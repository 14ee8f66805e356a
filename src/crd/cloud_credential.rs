//! # CloudCredential
//!
//! Cluster-scoped operator configuration of the cloud credential operator.

use serde::{Deserialize, Serialize};

/// CloudCredential operator configuration
///
/// # Example
///
/// ```yaml
/// apiVersion: operator.openshift.io/v1
/// kind: CloudCredential
/// metadata:
///   name: cluster
/// spec:
///   credentialsMode: Passthrough
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "CloudCredential",
    group = "operator.openshift.io",
    version = "v1",
    plural = "cloudcredentials"
)]
#[serde(rename_all = "camelCase")]
pub struct CloudCredentialSpec {
    /// Declared credentials mode: "", "Mint", "Passthrough" or "Manual"
    /// An empty string keeps the default behaviour of the platform
    #[serde(default)]
    pub credentials_mode: String,
    /// Operator log level, unused by the annotator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Operator management state, unused by the annotator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_state: Option<String>,
}

impl CloudCredential {
    /// Operator config object declaring `mode`
    #[must_use]
    pub fn with_mode(name: &str, mode: &str) -> Self {
        CloudCredential::new(
            name,
            CloudCredentialSpec {
                credentials_mode: mode.to_string(),
                ..CloudCredentialSpec::default()
            },
        )
    }
}
