//! # Observability
//!
//! Prometheus metrics for the annotator. Logging goes through `tracing` and is
//! configured in `runtime::initialization`.

pub mod metrics;

pub use metrics::*;
