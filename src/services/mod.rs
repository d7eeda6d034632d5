pub mod agent_registry;
pub mod chain_propagator;
pub mod circuit_breaker;
pub mod complexity_analyzer;
pub mod reaction_state;
pub mod recovery_manager;
pub mod resource_governor;
pub mod result_synthesizer;
pub mod role_catalog;
pub mod task_decomposer;
pub mod validation_engine;

pub use agent_registry::AgentRegistry;
pub use chain_propagator::ChainPropagator;
pub use circuit_breaker::{CircuitBreaker, CircuitCheckResult, CircuitState, CircuitStats};
pub use complexity_analyzer::HeuristicComplexityAnalyzer;
pub use reaction_state::ReactionState;
pub use recovery_manager::{AcknowledgeFallback, Recovered, RecoveryManager};
pub use resource_governor::ResourceGovernor;
pub use result_synthesizer::ResultSynthesizer;
pub use role_catalog::{DecompositionStyle, KindTable, RoleCatalog, RoleStrategies, SynthesisStyle};
pub use task_decomposer::{TaskDecomposer, MAX_SUBTASKS};
pub use validation_engine::{PreconditionContext, PreconditionKind, ValidationEngine, ValidationResult};
