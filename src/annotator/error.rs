//! # Annotator Errors

use super::mode::OperatingMode;
use crate::store::StoreError;
use thiserror::Error;

/// Reasons a reconciliation of the credentials secret stops
///
/// Every variant is terminal for the invocation; the secret is left untouched.
#[derive(Debug, Error)]
pub enum AnnotatorError {
    /// The legacy ConfigMap disables the operator while a mode is declared
    #[error(
        "legacy disable marker is set but CloudCredential declares credentials mode {mode:?}; remove one of them"
    )]
    ConfigConflict { mode: String },

    #[error("invalid credentials mode {mode:?}, expected one of \"\", \"Mint\", \"Passthrough\", \"Manual\"")]
    InvalidMode { mode: String },

    #[error("credentials mode {mode} is not supported on OpenStack")]
    UnsupportedMode { mode: OperatingMode },

    #[error("failed to parse clouds.yaml: {0}")]
    MalformedConfig(#[source] serde_yaml::Error),

    /// The document parsed but its `cacert` line could not be replaced in place
    #[error("failed to rewrite cacert in clouds.yaml: {reason}")]
    CaCertRewrite { reason: String },

    #[error("failed to update secret {secret}: {source}")]
    PersistenceFailure {
        secret: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read cluster state: {0}")]
    Lookup(#[from] StoreError),
}

impl AnnotatorError {
    /// Short machine-readable reason, used as a metrics label
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            AnnotatorError::ConfigConflict { .. } => "config-conflict",
            AnnotatorError::InvalidMode { .. } => "invalid-mode",
            AnnotatorError::UnsupportedMode { .. } => "unsupported-mode",
            AnnotatorError::MalformedConfig(_) => "malformed-config",
            AnnotatorError::CaCertRewrite { .. } => "ca-cert-rewrite",
            AnnotatorError::PersistenceFailure { .. } => "persistence-failure",
            AnnotatorError::Lookup(_) => "lookup",
        }
    }
}
