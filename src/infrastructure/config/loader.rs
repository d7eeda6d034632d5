use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{Config, ExecutorKind};

/// Upper bound accepted for `reactor.max_agents`
pub const MAX_AGENTS_LIMIT: usize = 10_000;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_agents: {0}. Must be between 1 and {MAX_AGENTS_LIMIT}")]
    InvalidMaxAgents(usize),

    #[error("Invalid max_depth: {0}. Must be at least 1")]
    InvalidMaxDepth(usize),

    #[error("Invalid propagation_timeout_secs: {0}. Must be at least 1")]
    InvalidPropagationTimeout(u64),

    #[error("Invalid failure_threshold: {0}. Cannot be 0")]
    InvalidFailureThreshold(u32),

    #[error("Invalid recovery_timeout_secs: {0}. Must be at least 1")]
    InvalidRecoveryTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid executor timeout_secs: {0}. Must be at least 1")]
    InvalidExecutorTimeout(u64),

    #[error("Command executor requires a non-empty executor.command")]
    EmptyExecutorCommand,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .chain-reactor/config.yaml (project config)
    /// 3. .chain-reactor/local.yaml (local overrides, optional)
    /// 4. Environment variables (`CHAIN_REACTOR_*`, `__` separates nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".chain-reactor/config.yaml"))
            .merge(Yaml::file(".chain-reactor/local.yaml"))
            .merge(Env::prefixed("CHAIN_REACTOR_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still override values from the file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("CHAIN_REACTOR_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let reactor = &config.reactor;
        if reactor.max_agents == 0 || reactor.max_agents > MAX_AGENTS_LIMIT {
            return Err(ConfigError::InvalidMaxAgents(reactor.max_agents));
        }
        if reactor.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(reactor.max_depth));
        }
        if reactor.propagation_timeout_secs == 0 {
            return Err(ConfigError::InvalidPropagationTimeout(
                reactor.propagation_timeout_secs,
            ));
        }

        let breaker = &config.circuit_breaker;
        if breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(breaker.failure_threshold));
        }
        if breaker.recovery_timeout_secs == 0 {
            return Err(ConfigError::InvalidRecoveryTimeout(breaker.recovery_timeout_secs));
        }

        // Validate retry config
        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }
        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        let executor = &config.executor;
        if executor.timeout_secs == 0 {
            return Err(ConfigError::InvalidExecutorTimeout(executor.timeout_secs));
        }
        if executor.kind == ExecutorKind::Command && executor.command.trim().is_empty() {
            return Err(ConfigError::EmptyExecutorCommand);
        }

        Ok(())
    }
}
