//! # Object Store
//!
//! Minimal get/update capability over typed cluster objects.
//!
//! The annotator only ever reads a handful of objects and writes back one
//! secret, so it talks to an [`ObjectStore`] instead of a `kube::Client`.
//! [`KubeStore`] backs it with the API server, [`InMemoryStore`] with a map
//! that mimics the API server's optimistic concurrency.

mod client;
mod memory;

pub use client::KubeStore;
pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Bounds every object handled by an [`ObjectStore`] must satisfy
pub trait StoredObject:
    kube::Resource<DynamicType = ()>
    + Clone
    + DeserializeOwned
    + Serialize
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
}

impl<K> StoredObject for K where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + fmt::Debug
        + Send
        + Sync
        + 'static
{
}

/// Namespaced (or cluster-scoped) name of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Key of an existing object, taken from its metadata
    pub fn of<K: kube::Resource>(object: &K) -> Self {
        let meta = object.meta();
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The object was modified since it was read (HTTP 409)
    #[error("{kind} {key} was modified concurrently (observed resourceVersion {resource_version:?})")]
    Conflict {
        kind: String,
        key: String,
        resource_version: Option<String>,
    },

    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: String },

    #[error("API request for {kind} {key} failed: {source}")]
    Api {
        kind: String,
        key: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to convert {kind} {key}: {source}")]
    Serialization {
        kind: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Whether the failure came from optimistic concurrency control
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Read/update access to typed cluster objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, `Ok(None)` when it does not exist
    async fn get<K: StoredObject>(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>;

    /// Replace an object
    ///
    /// The update carries the `resourceVersion` read earlier; a stale version
    /// fails with [`StoreError::Conflict`] instead of overwriting newer state.
    async fn update<K: StoredObject>(&self, object: &K) -> Result<K, StoreError>;
}

pub(crate) fn kind_of<K: StoredObject>() -> String {
    K::kind(&()).into_owned()
}
