//! # Runtime
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server, client
//! - `watch_loop`: the controller stream and its restart loop
//! - `error_policy`: retry scheduling and watch error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
