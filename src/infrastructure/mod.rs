//! Infrastructure layer module
//!
//! Adapters at the edge of the reactor:
//! - Configuration management
//! - Logging infrastructure
//! - Leaf executors implementing the `TaskExecutor` port

pub mod config;
pub mod executors;
pub mod logging;
