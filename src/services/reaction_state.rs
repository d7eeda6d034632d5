//! Per-reaction shared state.
//!
//! A fresh `ReactionState` is built for every reaction, so concurrent
//! reactions never share budgets, registries, or breaker history.

use tokio::sync::Mutex;

use crate::domain::models::CircuitBreakerConfig;
use crate::services::agent_registry::AgentRegistry;
use crate::services::circuit_breaker::CircuitBreaker;
use crate::services::resource_governor::ResourceGovernor;

pub struct ReactionState {
    pub governor: ResourceGovernor,
    pub registry: AgentRegistry,
    pub breaker: CircuitBreaker,
    diagnostics: Mutex<Vec<String>>,
}

impl ReactionState {
    pub fn new(max_agents: usize, max_depth: usize, breaker: CircuitBreakerConfig) -> Self {
        Self {
            governor: ResourceGovernor::new(max_agents, max_depth),
            registry: AgentRegistry::new(),
            breaker: CircuitBreaker::new(breaker),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// Append a diagnostic line to the reaction's error log.
    pub async fn note(&self, message: impl Into<String>) {
        self.diagnostics.lock().await.push(message.into());
    }

    pub async fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().await.clone()
    }
}
