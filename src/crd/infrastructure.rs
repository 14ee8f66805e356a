//! # Infrastructure
//!
//! Cluster-scoped description of the platform the cluster runs on.

use serde::{Deserialize, Serialize};

#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Infrastructure",
    group = "config.openshift.io",
    version = "v1",
    plural = "infrastructures",
    status = "InfrastructureStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    /// Reference to the cloud provider configuration ConfigMap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_config: Option<CloudConfigReference>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfigReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Unique name of the cluster's infrastructure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_name: Option<String>,
    /// Deprecated platform type, superseded by `platformStatus.type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_status: Option<PlatformStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    #[serde(default)]
    pub r#type: String,
}

impl Infrastructure {
    /// Platform type of the cluster, preferring `status.platformStatus.type`
    #[must_use]
    pub fn platform_type(&self) -> Option<&str> {
        let status = self.status.as_ref()?;
        status
            .platform_status
            .as_ref()
            .map(|platform_status| platform_status.r#type.as_str())
            .filter(|platform| !platform.is_empty())
            .or_else(|| status.platform.as_deref().filter(|p| !p.is_empty()))
    }
}
