//! Chain Reactor façade
//!
//! Builds the per-reaction state, spawns the root agent, drives the tree to
//! completion and folds the outcome into a [`ReactionReport`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use chain_reactor::application::ChainReactor;
//! use chain_reactor::domain::models::{Config, Role, Task};
//! use chain_reactor::infrastructure::executors::SimulatedExecutor;
//!
//! # async fn example() {
//! let reactor = ChainReactor::builder(Arc::new(SimulatedExecutor::new()))
//!     .config(Config::default())
//!     .build();
//!
//! let task = Task::new("platform", "orchestrate").with_attribute("scope", "large");
//! let report = reactor.initiate_chain_reaction(Role::Manager, task, 20, 4).await;
//! println!("{} agents, status {}", report.total_spawned, report.status);
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};
use uuid::Uuid;

use crate::application::report::{AgentSummary, ReactionReport, ReactionStatus};
use crate::domain::models::{Config, Output, Role, Task};
use crate::domain::ports::{ComplexityScorer, FallbackExecutor, TaskExecutor};
use crate::services::chain_propagator::ChainPropagator;
use crate::services::complexity_analyzer::HeuristicComplexityAnalyzer;
use crate::services::reaction_state::ReactionState;
use crate::services::recovery_manager::{AcknowledgeFallback, RecoveryManager};
use crate::services::role_catalog::RoleCatalog;

/// Entry point for running chain reactions.
///
/// Holds only immutable collaborators; every reaction gets its own
/// [`ReactionState`], so one reactor can run several reactions at once.
pub struct ChainReactor {
    config: Config,
    catalog: Arc<RoleCatalog>,
    executor: Arc<dyn TaskExecutor>,
    fallback: Arc<dyn FallbackExecutor>,
    scorer: Arc<dyn ComplexityScorer>,
}

/// Builder for [`ChainReactor`].
pub struct ChainReactorBuilder {
    config: Config,
    catalog: RoleCatalog,
    executor: Arc<dyn TaskExecutor>,
    fallback: Arc<dyn FallbackExecutor>,
    scorer: Arc<dyn ComplexityScorer>,
}

impl ChainReactorBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: RoleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn fallback(mut self, fallback: Arc<dyn FallbackExecutor>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn scorer(mut self, scorer: Arc<dyn ComplexityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn build(self) -> ChainReactor {
        ChainReactor {
            config: self.config,
            catalog: Arc::new(self.catalog),
            executor: self.executor,
            fallback: self.fallback,
            scorer: self.scorer,
        }
    }
}

impl ChainReactor {
    pub fn builder(executor: Arc<dyn TaskExecutor>) -> ChainReactorBuilder {
        ChainReactorBuilder {
            config: Config::default(),
            catalog: RoleCatalog::standard(),
            executor,
            fallback: Arc::new(AcknowledgeFallback),
            scorer: Arc::new(HeuristicComplexityAnalyzer::new()),
        }
    }

    /// Reactor with the stock catalog, scorer and fallback.
    pub fn new(config: Config, executor: Arc<dyn TaskExecutor>) -> Self {
        Self::builder(executor).config(config).build()
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Run a reaction using the configured agent and depth ceilings.
    pub async fn react(&self, root_role: Role, root_task: Task) -> ReactionReport {
        self.initiate_chain_reaction(
            root_role,
            root_task,
            self.config.reactor.max_agents,
            self.config.reactor.max_depth,
        )
        .await
    }

    /// Spawn a root agent of `root_role` for `root_task` and let it cascade.
    ///
    /// Never fails: a root that cannot be spawned, or that ends `Failed`,
    /// yields a report with `status: failed` and the reasons in `errors`.
    pub async fn initiate_chain_reaction(
        &self,
        root_role: Role,
        root_task: Task,
        max_agents: usize,
        max_depth: usize,
    ) -> ReactionReport {
        let started = Instant::now();
        let state = ReactionState::new(max_agents, max_depth, self.config.circuit_breaker.clone());
        let propagator = ChainPropagator::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.executor),
            Arc::clone(&self.scorer),
            RecoveryManager::with_fallback(self.config.retry.clone(), Arc::clone(&self.fallback)),
            self.config.reactor.propagation_timeout(),
        );

        info!(
            role = %root_role,
            task = %root_task.name,
            executor = self.executor.name(),
            max_agents,
            max_depth,
            "initiating chain reaction"
        );

        let root = match propagator.spawn(&state, root_role, root_task, None).await {
            Ok(root) => root,
            Err(err) => {
                error!(error = %err, "root agent could not be spawned");
                state.note(format!("root {root_role} spawn failed: {err}")).await;
                return Self::collect(&state, ReactionStatus::Failed, None, None, started).await;
            }
        };

        let root_id = root.id;
        let settled = propagator.propagate(&state, root).await;
        let status = if settled.succeeded() {
            ReactionStatus::Success
        } else {
            ReactionStatus::Failed
        };

        let report = Self::collect(&state, status, Some(root_id), settled.output, started).await;
        info!(
            status = %report.status,
            total_spawned = report.total_spawned,
            max_depth_reached = report.max_depth_reached,
            failed_agents = report.failed_agents(),
            duration_ms = report.duration_ms,
            "chain reaction finished"
        );
        report
    }

    async fn collect(
        state: &ReactionState,
        status: ReactionStatus,
        root_agent_id: Option<Uuid>,
        result: Option<Output>,
        started: Instant,
    ) -> ReactionReport {
        let agents = state.registry.snapshot().await;
        ReactionReport {
            status,
            root_agent_id,
            total_spawned: state.governor.spawned(),
            agents_by_role: state.registry.count_by_role().await,
            max_depth_reached: state.governor.max_depth_reached(),
            result,
            errors: state.diagnostics().await,
            circuit: state.breaker.stats().await,
            agents: agents.iter().map(AgentSummary::from).collect(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{ReactorError, ReactorResult};
    use crate::domain::ports::ExecutionContext;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl TaskExecutor for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, ctx: &ExecutionContext) -> ReactorResult<Output> {
            Ok(json!({"task": ctx.task.name}))
        }
    }

    struct Broken;

    #[async_trait]
    impl TaskExecutor for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn execute(&self, _ctx: &ExecutionContext) -> ReactorResult<Output> {
            Err(ReactorError::ExecutionFailed("no backend".into()))
        }
    }

    fn no_fallback_config() -> Config {
        let mut config = Config::default();
        config.retry.fallback_enabled = false;
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_ms = 2;
        config
    }

    #[tokio::test]
    async fn test_zero_budget_fails_without_root() {
        let reactor = ChainReactor::new(Config::default(), Arc::new(Echo));
        let report = reactor
            .initiate_chain_reaction(Role::Manager, Task::new("x", "orchestrate"), 0, 3)
            .await;

        assert_eq!(report.status, ReactionStatus::Failed);
        assert!(report.root_agent_id.is_none());
        assert_eq!(report.total_spawned, 0);
        assert!(report.errors[0].contains("Resource exhausted"));
    }

    #[tokio::test]
    async fn test_malformed_root_task_fails() {
        let reactor = ChainReactor::new(Config::default(), Arc::new(Echo));
        let report = reactor
            .initiate_chain_reaction(Role::Manager, Task::new("", "orchestrate"), 5, 3)
            .await;

        assert_eq!(report.status, ReactionStatus::Failed);
        assert!(report.errors[0].contains("task name cannot be empty"));
    }

    #[tokio::test]
    async fn test_leaf_root_success() {
        let reactor = ChainReactor::new(Config::default(), Arc::new(Echo));
        let report = reactor.react(Role::Documenter, Task::new("readme", "docs")).await;

        assert!(report.is_success());
        assert_eq!(report.total_spawned, 1);
        assert_eq!(report.result, Some(json!({"task": "readme"})));
        assert_eq!(report.agents_by_role.get(&Role::Documenter), Some(&1));
    }

    #[tokio::test]
    async fn test_root_failure_without_fallback() {
        let reactor = ChainReactor::new(no_fallback_config(), Arc::new(Broken));
        let report = reactor.react(Role::Tester, Task::new("suite", "testing")).await;

        assert_eq!(report.status, ReactionStatus::Failed);
        assert_eq!(report.failed_agents(), 1);
        assert_eq!(report.result.as_ref().unwrap()["kind"], "execution_failed");
        assert!(!report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_keeps_root_successful() {
        let mut config = no_fallback_config();
        config.retry.fallback_enabled = true;
        let reactor = ChainReactor::new(config, Arc::new(Broken));
        let report = reactor.react(Role::Tester, Task::new("suite", "testing")).await;

        assert!(report.is_success());
        assert_eq!(report.result.as_ref().unwrap()["fallback"], true);
        assert!(report.errors.iter().any(|line| line.contains("fallback")));
    }
}
