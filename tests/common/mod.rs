//! Shared fixtures for the reconciliation tests
//!
//! Builds the objects an OpenStack cluster would carry and seeds them into an
//! [`InMemoryStore`].

#![allow(dead_code, reason = "not every test binary uses every fixture")]

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use openstack_secret_annotator::config::ControllerConfig;
use openstack_secret_annotator::constants::{
    DEFAULT_CA_CERT_PATH, LEGACY_DISABLED_KEY, MODE_ANNOTATION,
};
use openstack_secret_annotator::crd::{
    CloudCredential, Infrastructure, InfrastructureSpec, InfrastructureStatus, PlatformStatus,
};
use openstack_secret_annotator::store::{InMemoryStore, ObjectStore};
use std::collections::BTreeMap;

pub const INCORRECT_CA_CERT_PATH: &str = "/incorrect/path/to/ca-bundle.pem";

pub const CLOUDS_WITHOUT_CA_CERT: &str = r#"
clouds:
  openstack:
    auth:
      auth_url: http://1.2.3.4:5000
      password: password
      project_domain_name: Default
      project_name: openshift
      user_domain_name: Default
      username: openshift
    identity_api_version: "3"
    region_name: regionOne
    verify: true
"#;

pub fn clouds_with_ca_cert(path: &str) -> String {
    format!(
        r#"
clouds:
  openstack:
    auth:
      auth_url: http://1.2.3.4:5000
      password: password
      project_domain_name: Default
      project_name: openshift
      user_domain_name: Default
      username: openshift
    cacert: {path}
    identity_api_version: "3"
    region_name: regionOne
    verify: true
"#
    )
}

pub fn config() -> ControllerConfig {
    ControllerConfig::default()
}

pub fn credentials_secret(clouds_yaml: &str) -> Secret {
    let config = config();
    let mut secret = Secret::default();
    secret.metadata.namespace = Some(config.secret_namespace.clone());
    secret.metadata.name = Some(config.secret_name.clone());
    secret.data = Some(BTreeMap::from([(
        config.clouds_secret_key,
        ByteString(clouds_yaml.as_bytes().to_vec()),
    )]));
    secret
}

pub fn operator_config(mode: &str) -> CloudCredential {
    CloudCredential::with_mode(&config().operator_config_name, mode)
}

pub fn legacy_config_map(disabled: &str) -> ConfigMap {
    let config = config();
    let mut config_map = ConfigMap::default();
    config_map.metadata.namespace = Some(config.operator_namespace);
    config_map.metadata.name = Some(config.legacy_config_map_name);
    config_map.data = Some(BTreeMap::from([(
        LEGACY_DISABLED_KEY.to_string(),
        disabled.to_string(),
    )]));
    config_map
}

pub fn infrastructure(platform: &str) -> Infrastructure {
    let mut infrastructure =
        Infrastructure::new(&config().infrastructure_name, InfrastructureSpec::default());
    infrastructure.status = Some(InfrastructureStatus {
        platform_status: Some(PlatformStatus {
            r#type: platform.to_string(),
        }),
        ..InfrastructureStatus::default()
    });
    infrastructure
}

/// Store holding the credentials secret and, when given, an operator config
pub async fn seeded_store(clouds_yaml: &str, mode: Option<&str>) -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .insert(credentials_secret(clouds_yaml))
        .await
        .expect("seed secret");
    if let Some(mode) = mode {
        store
            .insert(operator_config(mode))
            .await
            .expect("seed operator config");
    }
    store
        .insert(infrastructure("OpenStack"))
        .await
        .expect("seed infrastructure");
    store
}

pub async fn stored_secret(store: &InMemoryStore) -> Secret {
    store
        .get::<Secret>(&config().secret_key())
        .await
        .expect("read secret")
        .expect("secret exists")
}

pub fn mode_annotation(secret: &Secret) -> Option<&str> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(MODE_ANNOTATION))
        .map(String::as_str)
}

pub fn clouds_yaml(secret: &Secret) -> String {
    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(&config().clouds_secret_key))
        .map(|value| value.0.clone())
        .unwrap_or_default();
    String::from_utf8(bytes).expect("clouds.yaml is utf-8")
}

pub fn canonical_ca_cert_path() -> &'static str {
    DEFAULT_CA_CERT_PATH
}
