//! Circuit breaker guarding the spawn-and-execute path.
//!
//! Trips after a run of consecutive failures, blocks calls while open, and
//! lets a trial call through once the recovery timeout has elapsed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::errors::{ReactorError, ReactorResult};
use crate::domain::models::CircuitBreakerConfig;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally.
    Closed,
    /// Circuit is open, requests are blocked.
    Open,
    /// Circuit is testing if the guarded path has recovered.
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a circuit breaker check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitCheckResult {
    /// Request is allowed.
    Allowed,
    /// Request is blocked by open circuit.
    Blocked { retry_after: Duration },
    /// Circuit is in half-open state, testing recovery.
    Testing,
}

impl CircuitCheckResult {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed | Self::Testing)
    }

    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Statistics for a circuit breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub rejected_calls: u64,
    pub open_count: u32,
    pub opened_at: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
}

/// Breaker bookkeeping. Time is passed in so transitions are testable
/// without sleeping.
#[derive(Debug, Clone)]
pub struct BreakerState {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub rejected_calls: u64,
    pub open_count: u32,
    opened_at: Option<Instant>,
    opened_at_wall: Option<DateTime<Utc>>,
    last_failure: Option<String>,
    /// Start of the in-flight half-open trial, if any
    trial_started: Option<Instant>,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            total_failures: 0,
            rejected_calls: 0,
            open_count: 0,
            opened_at: None,
            opened_at_wall: None,
            last_failure: None,
            trial_started: None,
        }
    }
}

impl BreakerState {
    /// Decide whether a call may proceed at `now`.
    pub fn check(&mut self, config: &CircuitBreakerConfig, now: Instant) -> CircuitCheckResult {
        match self.state {
            CircuitState::Closed => CircuitCheckResult::Allowed,
            CircuitState::HalfOpen => match self.trial_started {
                // One trial at a time; an abandoned trial expires after the
                // recovery timeout
                Some(started) if now.saturating_duration_since(started) < config.recovery_timeout() => {
                    self.rejected_calls += 1;
                    CircuitCheckResult::Blocked {
                        retry_after: config.recovery_timeout() - now.saturating_duration_since(started),
                    }
                }
                _ => {
                    self.trial_started = Some(now);
                    CircuitCheckResult::Testing
                }
            },
            CircuitState::Open => {
                let opened_at = self.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed >= config.recovery_timeout() {
                    self.half_open();
                    self.trial_started = Some(now);
                    CircuitCheckResult::Testing
                } else {
                    self.rejected_calls += 1;
                    CircuitCheckResult::Blocked {
                        retry_after: config.recovery_timeout() - elapsed,
                    }
                }
            }
        }
    }

    /// Record a failure.
    pub fn record_failure(&mut self, error: impl Into<String>, config: &CircuitBreakerConfig, now: Instant) {
        self.consecutive_failures += 1;
        self.total_failures += 1;
        self.last_failure = Some(error.into());

        match self.state {
            CircuitState::Closed if self.consecutive_failures >= config.failure_threshold => {
                self.open(now);
            }
            // Any failure in half-open reopens the circuit
            CircuitState::HalfOpen => self.open(now),
            _ => {}
        }
    }

    /// Record a success.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        if self.state == CircuitState::HalfOpen {
            self.close();
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.trial_started = None;
        self.opened_at = Some(now);
        self.opened_at_wall = Some(Utc::now());
        self.open_count += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.trial_started = None;
        self.opened_at = None;
        self.opened_at_wall = None;
        self.consecutive_failures = 0;
    }

    fn half_open(&mut self) {
        self.state = CircuitState::HalfOpen;
    }

    /// Manually reset the circuit.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn stats(&self) -> CircuitStats {
        CircuitStats {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            total_failures: self.total_failures,
            rejected_calls: self.rejected_calls,
            open_count: self.open_count,
            opened_at: self.opened_at_wall,
            last_failure: self.last_failure.clone(),
        }
    }
}

/// Shared breaker for one reaction.
///
/// Every check and record is a single write-lock acquisition, so sibling
/// propagations observe a consistent state.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: RwLock<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(BreakerState::default()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Check if a request is allowed right now.
    pub async fn check(&self) -> CircuitCheckResult {
        if !self.config.enabled {
            return CircuitCheckResult::Allowed;
        }
        self.state.write().await.check(&self.config, Instant::now())
    }

    pub async fn record_failure(&self, error: impl Into<String>) {
        if !self.config.enabled {
            return;
        }
        let mut state = self.state.write().await;
        let was_open = state.state == CircuitState::Open;
        state.record_failure(error, &self.config, Instant::now());
        if !was_open && state.state == CircuitState::Open {
            warn!(
                consecutive_failures = state.consecutive_failures,
                open_count = state.open_count,
                recovery_timeout_secs = self.config.recovery_timeout_secs,
                "circuit breaker opened"
            );
        }
    }

    pub async fn record_success(&self) {
        if !self.config.enabled {
            return;
        }
        let mut state = self.state.write().await;
        let was_half_open = state.state == CircuitState::HalfOpen;
        state.record_success();
        if was_half_open {
            debug!("circuit breaker closed after successful trial call");
        }
    }

    /// Run `operation` under breaker protection.
    ///
    /// While open, `operation` is never invoked and `CircuitOpen` is
    /// returned. Only faults (see [`ReactorError::trips_breaker`]) count as
    /// failures; deterministic rejections leave the breaker untouched.
    pub async fn call<F, Fut, T>(&self, operation: F) -> ReactorResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ReactorResult<T>>,
    {
        if let CircuitCheckResult::Blocked { retry_after } = self.check().await {
            return Err(ReactorError::CircuitOpen { retry_after });
        }

        match operation().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) if err.trips_breaker() => {
                self.record_failure(err.to_string()).await;
                Err(err)
            }
            Err(err) => {
                self.release_trial().await;
                Err(err)
            }
        }
    }

    /// Let another caller run the half-open trial after one that proved
    /// nothing about the guarded operation.
    async fn release_trial(&self) {
        if self.config.enabled {
            self.state.write().await.trial_started = None;
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }

    pub async fn stats(&self) -> CircuitStats {
        self.state.read().await.stats()
    }

    pub async fn reset(&self) {
        self.state.write().await.reset();
    }

    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}
