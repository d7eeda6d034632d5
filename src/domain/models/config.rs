use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for the chain reactor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Reaction budgets and timeouts
    #[serde(default)]
    pub reactor: ReactorConfig,

    /// Circuit breaker guarding spawn and execution
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry and fallback policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Leaf executor selection
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Reaction budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReactorConfig {
    /// Maximum agents spawned in a single reaction
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,

    /// Maximum recursion depth (root = 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Bound on one agent's propagation, children included
    #[serde(default = "default_propagation_timeout_secs")]
    pub propagation_timeout_secs: u64,
}

const fn default_max_agents() -> usize {
    100
}

const fn default_max_depth() -> usize {
    10
}

const fn default_propagation_timeout_secs() -> u64 {
    60
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            max_agents: default_max_agents(),
            max_depth: default_max_depth(),
            propagation_timeout_secs: default_propagation_timeout_secs(),
        }
    }
}

impl ReactorConfig {
    pub const fn propagation_timeout(&self) -> Duration {
        Duration::from_secs(self.propagation_timeout_secs)
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CircuitBreakerConfig {
    /// Whether the breaker is active at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive failures before the circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Time the circuit stays open before a half-open trial
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_recovery_timeout_secs() -> u64 {
    30
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

impl CircuitBreakerConfig {
    pub const fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum attempts per guarded call, the first one included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Run the degraded fallback once retries are exhausted
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            fallback_enabled: default_true(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly, never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_log_rotation(),
        }
    }
}

/// Which leaf executor runs agent work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// Deterministic in-process stand-in
    #[default]
    Simulated,
    /// External program per leaf
    Command,
}

/// Leaf executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    #[serde(default)]
    pub kind: ExecutorKind,

    /// Program to run for the command executor
    #[serde(default)]
    pub command: String,

    /// Program arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-call timeout for the command executor
    #[serde(default = "default_executor_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_executor_timeout_secs() -> u64 {
    30
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            command: String::new(),
            args: Vec::new(),
            timeout_secs: default_executor_timeout_secs(),
        }
    }
}
