//! Retry-with-backoff around breaker-guarded calls, plus a degraded
//! fallback once retries run out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::{ReactorError, ReactorResult};
use crate::domain::models::{Output, RetryConfig};
use crate::domain::ports::{ExecutionContext, FallbackExecutor};
use crate::services::circuit_breaker::CircuitBreaker;

/// Default fallback: a pass-through acknowledgment that does no work.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcknowledgeFallback;

impl FallbackExecutor for AcknowledgeFallback {
    fn fallback(&self, ctx: &ExecutionContext, reason: &ReactorError) -> Output {
        json!({
            "fallback": true,
            "role": ctx.role,
            "task": ctx.task.name,
            "reason": reason.to_string(),
        })
    }
}

/// Output of a recovered execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub output: Output,
    pub via_fallback: bool,
}

pub struct RecoveryManager {
    config: RetryConfig,
    fallback: Arc<dyn FallbackExecutor>,
}

impl RecoveryManager {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_fallback(config, Arc::new(AcknowledgeFallback))
    }

    pub fn with_fallback(config: RetryConfig, fallback: Arc<dyn FallbackExecutor>) -> Self {
        Self { config, fallback }
    }

    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn backoff_schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.config.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.config.max_backoff_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `operation` through the breaker, retrying retryable failures up
    /// to `max_retries` attempts in total.
    ///
    /// `operation` receives the 1-based attempt number. Non-retryable errors
    /// and an open circuit return immediately.
    pub async fn retry<F, Fut, T>(&self, breaker: &CircuitBreaker, mut operation: F) -> ReactorResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ReactorResult<T>>,
    {
        let mut schedule = self.backoff_schedule();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match breaker.call(|| operation(attempt)).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = schedule
                        .next_backoff()
                        .unwrap_or_else(|| Duration::from_millis(self.config.max_backoff_ms));
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %err,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Execute a leaf with retries, falling back to the degraded path when
    /// retries are exhausted or the circuit is open.
    pub async fn execute<F, Fut>(
        &self,
        breaker: &CircuitBreaker,
        ctx: &ExecutionContext,
        mut operation: F,
    ) -> ReactorResult<Recovered>
    where
        F: FnMut(ExecutionContext) -> Fut,
        Fut: Future<Output = ReactorResult<Output>>,
    {
        let result = self
            .retry(breaker, |attempt| {
                let mut attempt_ctx = ctx.clone();
                attempt_ctx.attempt = attempt;
                operation(attempt_ctx)
            })
            .await;

        match result {
            Ok(output) => Ok(Recovered {
                output,
                via_fallback: false,
            }),
            Err(err) if self.config.fallback_enabled && Self::falls_back_on(&err) => {
                warn!(
                    agent_id = %ctx.agent_id,
                    role = %ctx.role,
                    error = %err,
                    "retries exhausted, running fallback"
                );
                Ok(Recovered {
                    output: self.fallback.fallback(ctx, &err),
                    via_fallback: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    const fn falls_back_on(err: &ReactorError) -> bool {
        err.is_retryable() || matches!(err, ReactorError::CircuitOpen { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CircuitBreakerConfig, Role, Task};
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    fn retry_config(max_retries: u32, fallback_enabled: bool) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 10,
            max_backoff_ms: 100,
            fallback_enabled,
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            agent_id: Uuid::new_v4(),
            role: Role::Builder,
            task: Task::new("compile", "build"),
            depth: 1,
            attempt: 1,
        }
    }

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            enabled: true,
            failure_threshold: threshold,
            recovery_timeout_secs: 30,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let manager = RecoveryManager::new(retry_config(3, true));
        let breaker = breaker(10);
        let calls = AtomicU32::new(0);

        let recovered = manager
            .execute(&breaker, &ctx(), |c| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if c.attempt < 3 {
                        Err(ReactorError::ExecutionFailed("flaky".into()))
                    } else {
                        Ok(json!({"attempt": c.attempt}))
                    }
                }
            })
            .await
            .unwrap();

        assert!(!recovered.via_fallback);
        assert_eq!(recovered.output["attempt"], 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_runs_fallback() {
        let manager = RecoveryManager::new(retry_config(3, true));
        let breaker = breaker(10);
        let calls = AtomicU32::new(0);

        let recovered = manager
            .execute(&breaker, &ctx(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ReactorError::ExecutionFailed("down".into())) }
            })
            .await
            .unwrap();

        assert!(recovered.via_fallback);
        assert_eq!(recovered.output["fallback"], true);
        assert_eq!(recovered.output["role"], "builder");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_without_fallback_fails() {
        let manager = RecoveryManager::new(retry_config(2, false));
        let breaker = breaker(10);

        let err = manager
            .execute(&breaker, &ctx(), |_| async {
                Err(ReactorError::ExecutionFailed("down".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReactorError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let manager = RecoveryManager::new(retry_config(3, true));
        let breaker = breaker(10);
        let calls = AtomicU32::new(0);

        let err = manager
            .execute(&breaker, &ctx(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ReactorError::ValidationFailed(vec!["bad task".into()])) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReactorError::ValidationFailed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_goes_straight_to_fallback() {
        let manager = RecoveryManager::new(retry_config(3, true));
        let breaker = breaker(1);
        breaker.record_failure("earlier fault").await;

        let calls = AtomicU32::new(0);
        let recovered = manager
            .execute(&breaker, &ctx(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!("never")) }
            })
            .await
            .unwrap();

        assert!(recovered.via_fallback);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(recovered.output["reason"].as_str().unwrap().contains("Circuit breaker open"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_between_attempts() {
        let manager = RecoveryManager::new(RetryConfig {
            max_retries: 4,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            fallback_enabled: false,
        });
        let breaker = breaker(10);
        let started = tokio::time::Instant::now();

        let _ = manager
            .retry(&breaker, |_| async { Err::<(), _>(ReactorError::ExecutionFailed("x".into())) })
            .await;

        // 100 + 200 + 400 ms between four attempts
        assert!(started.elapsed() >= Duration::from_millis(700));
    }
}
