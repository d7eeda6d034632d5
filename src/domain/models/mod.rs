pub mod agent;
pub mod blueprint;
pub mod config;
pub mod role;
pub mod task;

pub use agent::{Agent, AgentStatus, ChildResult, Output};
pub use blueprint::{Blueprint, OutputSchema};
pub use config::{
    CircuitBreakerConfig, Config, ExecutorConfig, ExecutorKind, LoggingConfig, ReactorConfig,
    RetryConfig,
};
pub use role::Role;
pub use task::{Subtask, Task};
