//! # Prelude
//!
//! Commonly used types, importable with `use openstack_secret_annotator::prelude::*;`.

pub use crate::crd::*;

pub use crate::annotator::{
    normalize_ca_cert, resolve, AnnotatorError, OperatingMode, ReconcileOutcome, SecretAnnotator,
};

pub use crate::store::{InMemoryStore, KubeStore, ObjectKey, ObjectStore, StoreError};

pub use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError};

pub use crate::config::ControllerConfig;
