//! # Mode Resolution
//!
//! Decides the effective credentials mode from the `CloudCredential` operator
//! config and the legacy "disabled" ConfigMap.

use super::error::AnnotatorError;
use crate::constants::LEGACY_DISABLED_KEY;
use k8s_openapi::api::core::v1::ConfigMap;
use std::fmt;
use tracing::warn;

/// Credentials mode declared for the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatingMode {
    /// Empty declaration, platform default behaviour
    Unset,
    Mint,
    Passthrough,
    Manual,
    /// Any token outside the recognized set
    Invalid(String),
}

impl OperatingMode {
    /// Parse a declared mode token; matching is case-sensitive
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "" => OperatingMode::Unset,
            "Mint" => OperatingMode::Mint,
            "Passthrough" => OperatingMode::Passthrough,
            "Manual" => OperatingMode::Manual,
            other => OperatingMode::Invalid(other.to_string()),
        }
    }

    /// Token as it appears in `spec.credentialsMode`
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            OperatingMode::Unset => "",
            OperatingMode::Mint => "Mint",
            OperatingMode::Passthrough => "Passthrough",
            OperatingMode::Manual => "Manual",
            OperatingMode::Invalid(token) => token.as_str(),
        }
    }

    /// Value of the mode annotation, `None` when no annotation should be set
    #[must_use]
    pub fn annotation_value(&self) -> Option<&'static str> {
        match self {
            OperatingMode::Mint => Some("mint"),
            OperatingMode::Passthrough => Some("passthrough"),
            OperatingMode::Manual => Some("manual"),
            OperatingMode::Unset | OperatingMode::Invalid(_) => None,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Unset => f.write_str("<unset>"),
            other => write!(f, "{:?}", other.token()),
        }
    }
}

/// Resolve the effective mode
///
/// The legacy marker only conflicts with an explicit declaration; an empty
/// mode is always accepted. Mint is recognized but cannot work on OpenStack.
pub fn resolve(declared_mode: &str, legacy_disabled: bool) -> Result<OperatingMode, AnnotatorError> {
    if legacy_disabled && !declared_mode.is_empty() {
        return Err(AnnotatorError::ConfigConflict {
            mode: declared_mode.to_string(),
        });
    }

    match OperatingMode::from_token(declared_mode) {
        OperatingMode::Invalid(mode) => Err(AnnotatorError::InvalidMode { mode }),
        OperatingMode::Mint => Err(AnnotatorError::UnsupportedMode {
            mode: OperatingMode::Mint,
        }),
        mode => Ok(mode),
    }
}

/// Whether the legacy ConfigMap disables the operator
///
/// A missing ConfigMap or key means "not disabled". Values are read like Go's
/// `strconv.ParseBool`; anything else is logged and ignored.
#[must_use]
pub fn legacy_disabled(config_map: Option<&ConfigMap>) -> bool {
    let Some(value) = config_map
        .and_then(|cm| cm.data.as_ref())
        .and_then(|data| data.get(LEGACY_DISABLED_KEY))
    else {
        return false;
    };

    parse_bool(value).unwrap_or_else(|| {
        warn!(
            "Ignoring unparsable value {:?} for {:?} in legacy ConfigMap",
            value, LEGACY_DISABLED_KEY
        );
        false
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
