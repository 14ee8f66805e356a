//! # Secret Annotator
//!
//! Decision logic for the OpenStack root credentials secret.
//!
//! - `mode`: resolves the credentials mode from the operator config and the legacy ConfigMap
//! - `clouds`: normalizes the CA certificate path inside `clouds.yaml`
//! - `reconcile`: fetches the objects, applies both decisions and persists the secret once
//! - `error`: error taxonomy shared by the above

pub mod clouds;
pub mod error;
pub mod mode;
pub mod reconcile;

pub use clouds::{normalize_ca_cert, CloudsConfig, NormalizedPayload, OpenStackCloud};
pub use error::AnnotatorError;
pub use mode::{legacy_disabled, resolve, OperatingMode};
pub use reconcile::{apply_mode_annotation, ReconcileOutcome, SecretAnnotator};
