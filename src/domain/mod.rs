//! Domain layer for the chain reactor
//!
//! Agents, roles, blueprints, tasks, errors, and the ports hosts implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ReactorError, ReactorResult};
