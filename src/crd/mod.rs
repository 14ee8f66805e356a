//! # Custom Resource Definitions
//!
//! Typed views of the OpenShift resources the annotator reads.
//!
//! The CRDs themselves are installed and owned by the cluster; only the fields
//! this controller consumes are modeled, and everything else is ignored on
//! deserialization.
//!
//! ## Module Structure
//!
//! - `cloud_credential.rs` - `CloudCredential` operator configuration (`operator.openshift.io/v1`)
//! - `infrastructure.rs` - `Infrastructure` cluster configuration (`config.openshift.io/v1`)

mod cloud_credential;
mod infrastructure;

pub use cloud_credential::{CloudCredential, CloudCredentialSpec};
pub use infrastructure::{
    CloudConfigReference, Infrastructure, InfrastructureSpec, InfrastructureStatus, PlatformStatus,
};
