//! CLI command implementations.

pub mod config;
pub mod react;
pub mod roles;
