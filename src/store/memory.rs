//! # In-Memory Store
//!
//! [`ObjectStore`] kept in a map, used by tests.
//!
//! Behaves like the API server where the annotator can observe it:
//! every write bumps `metadata.resourceVersion`, and an update carrying a
//! stale version is rejected with [`StoreError::Conflict`].
//! This is ephemeral - data does not persist across restarts.

use super::{kind_of, ObjectKey, ObjectStore, StoreError, StoredObject};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type EntryKey = (String, ObjectKey);

#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    objects: Arc<RwLock<HashMap<EntryKey, Value>>>,
    last_version: Arc<AtomicU64>,
    updates: Arc<AtomicUsize>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite an object, assigning it a fresh resourceVersion
    ///
    /// Seeding does not count as an update.
    pub async fn insert<K: StoredObject>(&self, mut object: K) -> Result<K, StoreError> {
        let key = ObjectKey::of(&object);
        object.meta_mut().resource_version = Some(self.next_version());
        let value = to_value::<K>(&object, &key)?;
        self.objects
            .write()
            .await
            .insert((type_key::<K>(), key), value);
        Ok(object)
    }

    /// Number of successful updates since the store was created
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn next_version(&self) -> String {
        (self.last_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get<K: StoredObject>(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        let objects = self.objects.read().await;
        objects
            .get(&(type_key::<K>(), key.clone()))
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| {
                    StoreError::Serialization {
                        kind: kind_of::<K>(),
                        key: key.to_string(),
                        source,
                    }
                })
            })
            .transpose()
    }

    async fn update<K: StoredObject>(&self, object: &K) -> Result<K, StoreError> {
        let key = ObjectKey::of(object);
        let mut objects = self.objects.write().await;
        let entry_key = (type_key::<K>(), key.clone());

        let Some(current) = objects.get(&entry_key) else {
            return Err(StoreError::NotFound {
                kind: kind_of::<K>(),
                key: key.to_string(),
            });
        };

        let stored_version = current
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str);
        let observed_version = object.meta().resource_version.as_deref();
        if stored_version != observed_version {
            debug!(
                "Rejecting update of {} {}: stored resourceVersion {:?}, observed {:?}",
                kind_of::<K>(),
                key,
                stored_version,
                observed_version
            );
            return Err(StoreError::Conflict {
                kind: kind_of::<K>(),
                key: key.to_string(),
                resource_version: observed_version.map(str::to_string),
            });
        }

        let mut updated = object.clone();
        updated.meta_mut().resource_version = Some(self.next_version());
        let value = to_value::<K>(&updated, &key)?;
        objects.insert(entry_key, value);
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(updated)
    }
}

fn type_key<K: StoredObject>() -> String {
    format!("{}/{}", K::api_version(&()), K::kind(&()))
}

fn to_value<K: StoredObject>(object: &K, key: &ObjectKey) -> Result<Value, StoreError> {
    serde_json::to_value(object).map_err(|source| StoreError::Serialization {
        kind: kind_of::<K>(),
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ConfigMap, Secret};
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn config_map(data: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("settings".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_missing_object_returns_none() {
        let store = InMemoryStore::new();
        let found: Option<ConfigMap> = store
            .get(&ObjectKey::namespaced("default", "settings"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_objects_are_keyed_by_kind() {
        let store = InMemoryStore::new();
        store.insert(config_map(&[("a", "b")])).await.unwrap();

        let key = ObjectKey::namespaced("default", "settings");
        let as_config_map: Option<ConfigMap> = store.get(&key).await.unwrap();
        let as_secret: Option<Secret> = store.get(&key).await.unwrap();
        assert!(as_config_map.is_some());
        assert!(as_secret.is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_resource_version_and_counts_writes() {
        let store = InMemoryStore::new();
        let seeded = store.insert(config_map(&[("a", "b")])).await.unwrap();
        assert_eq!(store.update_count(), 0);

        let mut changed = seeded.clone();
        changed
            .data
            .get_or_insert_with(BTreeMap::new)
            .insert("a".to_string(), "c".to_string());
        let updated = store.update(&changed).await.unwrap();

        assert_ne!(
            updated.metadata.resource_version,
            seeded.metadata.resource_version
        );
        assert_eq!(store.update_count(), 1);

        let fetched: ConfigMap = store
            .get(&ObjectKey::of(&seeded))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.data.unwrap()["a"], "c");
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let store = InMemoryStore::new();
        let seeded = store.insert(config_map(&[("a", "b")])).await.unwrap();

        store.update(&seeded).await.unwrap();
        let err = store.update(&seeded).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn test_update_of_missing_object_fails() {
        let store = InMemoryStore::new();
        let err = store.update(&config_map(&[])).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
