//! Chain Reactor - bounded recursive task decomposition
//!
//! A root agent receives a task, scores its complexity and either executes
//! it or decomposes it into subtasks handled by child agents of other roles.
//! Children recurse the same way until the agent budget, the depth limit or
//! a role's blueprint stops further spawning; parents then synthesize their
//! children's results.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): roles, blueprints, tasks, agents, errors and ports
//! - **Service Layer** (`services`): governor, registry, breaker, recovery, propagation
//! - **Application Layer** (`application`): the `ChainReactor` facade and reports
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, leaf executors
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chain_reactor::{ChainReactor, Config, Role, Task};
//! use chain_reactor::infrastructure::executors::SimulatedExecutor;
//!
//! #[tokio::main]
//! async fn main() {
//!     let reactor = ChainReactor::new(Config::default(), Arc::new(SimulatedExecutor::new()));
//!     let task = Task::new("ship release", "orchestrate")
//!         .with_attribute("scope", "large")
//!         .with_requirements(["build", "test", "document"]);
//!     let report = reactor.initiate_chain_reaction(Role::Manager, task, 20, 3).await;
//!     println!("{} agents, status {}", report.total_spawned, report.status);
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{AgentSummary, ChainReactor, ChainReactorBuilder, ReactionReport, ReactionStatus};
pub use domain::errors::{ReactorError, ReactorResult};
pub use domain::models::{
    Agent, AgentStatus, Blueprint, ChildResult, Config, OutputSchema, Output, Role, Subtask, Task,
};
pub use domain::ports::{
    ComplexityScorer, DecompositionStrategy, ExecutionContext, FallbackExecutor, SynthesisStrategy,
    TaskExecutor,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::RoleCatalog;
