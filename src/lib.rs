//! OpenStack Secret Annotator Library
//!
//! Keeps the OpenStack root credentials secret annotated with the cluster's
//! cloud credentials mode and its `clouds.yaml` pointing at the mounted CA
//! bundle.
//!
//! ## Quick Start
//!
//! ```rust
//! use openstack_secret_annotator::prelude::*;
//! ```

pub mod annotator;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod store;
