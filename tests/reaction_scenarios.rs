//! End-to-end reactions through the `ChainReactor` facade.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chain_reactor::domain::models::{AgentStatus, Config, Role, Task};
use chain_reactor::domain::ports::ComplexityScorer;
use chain_reactor::infrastructure::executors::SimulatedExecutor;
use chain_reactor::services::CircuitState;
use chain_reactor::{ChainReactor, ReactionReport, ReactionStatus};

/// Scores every task as maximally complex so decomposition is limited only
/// by budgets and blueprints.
struct AlwaysComplex;

impl ComplexityScorer for AlwaysComplex {
    fn score(&self, _task: &Task) -> f64 {
        1.0
    }
}

fn quick_config() -> Config {
    let mut config = Config::default();
    config.retry.initial_backoff_ms = 10;
    config.retry.max_backoff_ms = 40;
    config
}

fn release_task() -> Task {
    Task::new("ship release", "orchestrate")
        .with_attribute("scope", "large")
        .with_requirements([
            "design the schema",
            "implement storage",
            "write tests",
            "review the api",
            "deploy to staging",
            "document endpoints",
        ])
}

fn reactor(executor: SimulatedExecutor) -> ChainReactor {
    ChainReactor::new(quick_config(), Arc::new(executor))
}

fn shape(report: &ReactionReport) -> Vec<(usize, Role, String)> {
    let mut shape: Vec<_> = report
        .agents
        .iter()
        .map(|agent| (agent.depth, agent.role, agent.task.clone()))
        .collect();
    shape.sort();
    shape
}

#[tokio::test]
async fn test_large_orchestration_fans_out_once_per_requirement() {
    let report = reactor(SimulatedExecutor::new())
        .initiate_chain_reaction(Role::Manager, release_task(), 11, 3)
        .await;

    assert_eq!(report.status, ReactionStatus::Success);
    assert!(report.total_spawned >= 2 && report.total_spawned <= 11);
    assert_eq!(report.agents_by_role.get(&Role::Manager), Some(&1));
    assert_eq!(report.agents.len(), report.total_spawned);
    assert!(report.errors.is_empty(), "unexpected errors: {:?}", report.errors);

    let root = report.root().unwrap();
    assert_eq!(root.depth, 0);
    assert_eq!(root.child_ids.len(), 6);

    let result = report.result.as_ref().unwrap();
    assert_eq!(result["strategy"], "aggregate");
    assert_eq!(result["children_total"], 6);
    assert_eq!(result["children_completed"], 6);
}

#[tokio::test]
async fn test_single_agent_budget_executes_root_directly() {
    let report = reactor(SimulatedExecutor::new())
        .initiate_chain_reaction(Role::Manager, release_task(), 1, 3)
        .await;

    assert_eq!(report.status, ReactionStatus::Success);
    assert_eq!(report.total_spawned, 1);
    assert_eq!(report.max_depth_reached, 0);
    assert_eq!(report.result.as_ref().unwrap()["task"], "ship release");
}

#[tokio::test]
async fn test_exhausted_budget_stops_spawning_without_failing() {
    let report = reactor(SimulatedExecutor::new())
        .initiate_chain_reaction(Role::Manager, release_task(), 3, 3)
        .await;

    assert!(report.is_success());
    assert_eq!(report.total_spawned, 3);
    assert_eq!(report.failed_agents(), 0);
    assert!(report.errors.iter().any(|e| e.contains("skipped")));
}

#[tokio::test(start_paused = true)]
async fn test_child_failure_does_not_fail_root() {
    let mut config = quick_config();
    config.retry.fallback_enabled = false;
    let reactor = ChainReactor::new(
        config,
        Arc::new(SimulatedExecutor::new().with_failures(["write tests"])),
    );

    let report = reactor
        .initiate_chain_reaction(Role::Manager, release_task(), 20, 3)
        .await;

    assert_eq!(report.status, ReactionStatus::Success);
    assert_eq!(report.failed_agents(), 1);

    let result = report.result.as_ref().unwrap();
    assert_eq!(result["children_failed"], 1);
    assert_eq!(result["children_completed"], 5);

    let failed = report
        .agents
        .iter()
        .find(|agent| agent.status == AgentStatus::Failed)
        .unwrap();
    assert_eq!(failed.role, Role::Tester);
    assert!(failed.error.as_ref().unwrap().contains("simulated failure"));
    assert!(report.errors.iter().any(|e| e.contains("tester agent")));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_completes_failing_leaf() {
    let report = reactor(SimulatedExecutor::new().with_failures(["write tests"]))
        .initiate_chain_reaction(Role::Manager, release_task(), 20, 3)
        .await;

    assert!(report.is_success());
    assert_eq!(report.failed_agents(), 0);
    assert!(report.errors.iter().any(|e| e.contains("completed via fallback")));

    let results = report.result.as_ref().unwrap()["results"].as_array().unwrap().clone();
    assert!(results.iter().any(|r| r["fallback"] == true));
}

#[tokio::test]
async fn test_leaf_roles_never_decompose() {
    let reactor = ChainReactor::builder(Arc::new(SimulatedExecutor::new()))
        .config(quick_config())
        .scorer(Arc::new(AlwaysComplex))
        .build();

    for role in [Role::Tester, Role::Reviewer, Role::Deployer, Role::Documenter] {
        let report = reactor.initiate_chain_reaction(role, release_task(), 50, 5).await;
        assert!(report.is_success(), "{role} failed");
        assert_eq!(report.total_spawned, 1, "{role} spawned children");
    }
}

#[tokio::test]
async fn test_depth_limit_holds_under_maximal_complexity() {
    let reactor = ChainReactor::builder(Arc::new(SimulatedExecutor::new()))
        .config(quick_config())
        .scorer(Arc::new(AlwaysComplex))
        .build();

    for max_depth in 0..=3 {
        let report = reactor
            .initiate_chain_reaction(Role::Manager, Task::new("platform", "orchestrate"), 200, max_depth)
            .await;

        assert!(report.is_success());
        assert!(report.max_depth_reached <= max_depth);
        assert!(report.agents.iter().all(|agent| agent.depth <= max_depth));
        if max_depth > 0 {
            assert!(report.total_spawned > 1);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_leaf_times_out() {
    let mut config = quick_config();
    config.reactor.propagation_timeout_secs = 5;
    let reactor = ChainReactor::new(
        config,
        Arc::new(SimulatedExecutor::new().with_latency(Duration::from_secs(30))),
    );

    let report = reactor
        .initiate_chain_reaction(Role::Tester, Task::new("soak test", "testing"), 5, 2)
        .await;

    assert_eq!(report.status, ReactionStatus::Failed);
    assert_eq!(report.result.as_ref().unwrap()["kind"], "timeout");
    let root = report.root().unwrap();
    assert_eq!(root.status, AgentStatus::Failed);
    assert!(root.error.as_ref().unwrap().contains("timed out"));
    assert!(report.errors.iter().any(|e| e.contains("timed out")));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_failures_open_the_circuit() {
    let mut config = quick_config();
    config.circuit_breaker.failure_threshold = 2;
    config.retry.fallback_enabled = false;
    let reactor = ChainReactor::new(
        config,
        Arc::new(SimulatedExecutor::new().with_failures(["alpha", "beta", "gamma"])),
    );
    let task = Task::new("doomed", "orchestrate")
        .with_attribute("scope", "large")
        .with_requirements(["alpha", "beta", "gamma"]);

    let report = reactor.initiate_chain_reaction(Role::Manager, task, 10, 2).await;

    assert_eq!(report.circuit.state, CircuitState::Open);
    assert!(report.circuit.open_count >= 1);
    assert!(report.circuit.total_failures >= 2);
    assert!(report.circuit.rejected_calls >= 1);
    assert_eq!(report.failed_agents(), 3);
    assert!(report.errors.iter().any(|e| e.contains("Circuit breaker open")));

    // Children failing never fails a root that could still synthesize
    assert!(report.is_success());
    assert_eq!(report.result.as_ref().unwrap()["children_failed"], 3);
}

#[tokio::test]
async fn test_identical_reactions_build_identical_trees() {
    let reactor = reactor(SimulatedExecutor::new());

    let first = reactor
        .initiate_chain_reaction(Role::Manager, release_task(), 30, 3)
        .await;
    let second = reactor
        .initiate_chain_reaction(Role::Manager, release_task(), 30, 3)
        .await;

    assert_eq!(shape(&first), shape(&second));
    assert_eq!(first.agents_by_role, second.agents_by_role);
    assert_eq!(first.result, second.result);
}

#[tokio::test]
async fn test_report_serializes_for_json_output() {
    let report = reactor(SimulatedExecutor::new())
        .initiate_chain_reaction(Role::Architect, Task::new("api", "design"), 10, 2)
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["circuit"]["state"], "closed");
    let by_role: BTreeMap<String, usize> =
        serde_json::from_value(json["agents_by_role"].clone()).unwrap();
    assert_eq!(by_role.get("architect"), Some(&1));
}
