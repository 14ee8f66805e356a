//! # Kubernetes Store
//!
//! [`ObjectStore`] backed by the Kubernetes API server.
//!
//! Objects go through `Api<DynamicObject>` so that namespaced and
//! cluster-scoped kinds share one code path; typed values are converted with
//! `serde_json` on the way in and out.

use super::{kind_of, ObjectKey, ObjectStore, StoreError, StoredObject};
use crate::constants::CONTROLLER_NAME;
use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, PostParams};
use kube::Client;
use tracing::debug;

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoredObject>(&self, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = ApiResource::erase::<K>(&());
        match namespace {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoredObject>(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        let api = self.api::<K>(key.namespace.as_deref());
        match api.get(&key.name).await {
            Ok(object) => convert::<K, _, K>(&object, key).map(Some),
            Err(err) => match get_error(kind_of::<K>(), key, err) {
                Some(err) => Err(err),
                None => {
                    debug!("{} {} not found", kind_of::<K>(), key);
                    Ok(None)
                }
            },
        }
    }

    async fn update<K: StoredObject>(&self, object: &K) -> Result<K, StoreError> {
        let key = ObjectKey::of(object);
        let dynamic: DynamicObject = convert::<K, _, _>(object, &key)?;
        let api = self.api::<K>(key.namespace.as_deref());
        let params = PostParams {
            field_manager: Some(CONTROLLER_NAME.to_string()),
            ..PostParams::default()
        };

        match api.replace(&key.name, &params, &dynamic).await {
            Ok(updated) => convert::<K, _, K>(&updated, &key),
            Err(err) => Err(update_error(
                kind_of::<K>(),
                &key,
                object.meta().resource_version.clone(),
                err,
            )),
        }
    }
}

/// Map a failed get; `None` means the object does not exist
fn get_error(kind: String, key: &ObjectKey, err: kube::Error) -> Option<StoreError> {
    match err {
        kube::Error::Api(api_err) if api_err.code == 404 => None,
        source => Some(StoreError::Api {
            kind,
            key: key.to_string(),
            source,
        }),
    }
}

/// Map a failed replace of an object last read at `resource_version`
fn update_error(
    kind: String,
    key: &ObjectKey,
    resource_version: Option<String>,
    err: kube::Error,
) -> StoreError {
    match err {
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
            kind,
            key: key.to_string(),
            resource_version,
        },
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound {
            kind,
            key: key.to_string(),
        },
        source => StoreError::Api {
            kind,
            key: key.to_string(),
            source,
        },
    }
}

/// Re-type an object through its JSON representation
fn convert<K, T, U>(object: &T, key: &ObjectKey) -> Result<U, StoreError>
where
    K: StoredObject,
    T: serde::Serialize,
    U: serde::de::DeserializeOwned,
{
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|source| StoreError::Serialization {
            kind: kind_of::<K>(),
            key: key.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("secrets \"openstack-credentials\" {reason}"),
            reason: reason.to_string(),
            code,
        })
    }

    fn key() -> ObjectKey {
        ObjectKey::namespaced("kube-system", "openstack-credentials")
    }

    #[test]
    fn test_get_not_found_is_absent() {
        assert!(get_error("Secret".to_string(), &key(), api_error(404, "NotFound")).is_none());
    }

    #[test]
    fn test_get_other_errors_are_api_errors() {
        for code in [403, 409, 500] {
            let err = get_error("Secret".to_string(), &key(), api_error(code, "Failure"))
                .unwrap_or_else(|| panic!("{code} must not look like a missing object"));
            match err {
                StoreError::Api { kind, key, source } => {
                    assert_eq!(kind, "Secret");
                    assert_eq!(key, "kube-system/openstack-credentials");
                    assert!(matches!(source, kube::Error::Api(e) if e.code == code));
                }
                other => panic!("{code}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_update_error_mapping() {
        let version = Some("42".to_string());

        let conflict = update_error(
            "Secret".to_string(),
            &key(),
            version.clone(),
            api_error(409, "Conflict"),
        );
        assert!(conflict.is_conflict());
        assert!(matches!(
            conflict,
            StoreError::Conflict { resource_version, .. } if resource_version == version
        ));

        let missing = update_error(
            "Secret".to_string(),
            &key(),
            version.clone(),
            api_error(404, "NotFound"),
        );
        assert!(matches!(missing, StoreError::NotFound { .. }));

        let server = update_error(
            "Secret".to_string(),
            &key(),
            version,
            api_error(500, "InternalError"),
        );
        assert!(!server.is_conflict());
        assert!(matches!(
            server,
            StoreError::Api { source: kube::Error::Api(e), .. } if e.code == 500
        ));
    }
}
