use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::{ReactorError, ReactorResult};
use crate::domain::models::{ExecutorConfig, Output};
use crate::domain::ports::{ExecutionContext, TaskExecutor};

/// Runs an external program for every leaf.
///
/// The program receives the task as JSON on stdin and in
/// `CHAIN_REACTOR_TASK`, plus `CHAIN_REACTOR_ROLE` and
/// `CHAIN_REACTOR_ATTEMPT`. Stdout is parsed as JSON when possible and
/// otherwise returned as `{"text": ...}`.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn failure(&self, detail: impl std::fmt::Display) -> ReactorError {
        ReactorError::ExecutionFailed(format!("{}: {detail}", self.command))
    }
}

#[async_trait]
impl TaskExecutor for CommandExecutor {
    fn name(&self) -> &str {
        "command"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> ReactorResult<Output> {
        let payload = serde_json::to_string(&ctx.task).map_err(|e| self.failure(e))?;

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .env("CHAIN_REACTOR_ROLE", ctx.role.as_str())
            .env("CHAIN_REACTOR_TASK", &payload)
            .env("CHAIN_REACTOR_ATTEMPT", ctx.attempt.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(format!("failed to start: {e}")))?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                // Programs that ignore stdin may close it early
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    debug!(error = %e, "task payload not consumed on stdin");
                }
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| self.failure(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| self.failure(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                command = %self.command,
                status = %output.status,
                stderr = %stderr.trim(),
                "leaf command failed"
            );
            return Err(self.failure(format!("exited with {}: {}", output.status, stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        Ok(serde_json::from_str::<Value>(text).unwrap_or_else(|_| json!({ "text": text })))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::models::{Role, Task};
    use uuid::Uuid;

    fn sh(script: &str) -> CommandExecutor {
        CommandExecutor::new("sh", vec!["-c".to_string(), script.to_string()], Duration::from_secs(5))
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            agent_id: Uuid::new_v4(),
            role: Role::Tester,
            task: Task::new("unit tests", "testing").with_requirements(["cover parser"]),
            depth: 1,
            attempt: 2,
        }
    }

    #[tokio::test]
    async fn test_json_stdout_is_parsed() {
        let output = sh("cat").execute(&ctx()).await.unwrap();
        assert_eq!(output["name"], "unit tests");
        assert_eq!(output["requirements"][0], "cover parser");
    }

    #[tokio::test]
    async fn test_plain_stdout_is_wrapped() {
        let output = sh("echo \"$CHAIN_REACTOR_ROLE attempt $CHAIN_REACTOR_ATTEMPT\"")
            .execute(&ctx())
            .await
            .unwrap();
        assert_eq!(output, json!({"text": "tester attempt 2"}));
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let err = sh("echo broken >&2; exit 3").execute(&ctx()).await.unwrap_err();
        match err {
            ReactorError::ExecutionFailed(message) => assert!(message.contains("broken")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_fails() {
        let executor = CommandExecutor::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(100),
        );
        let err = executor.execute(&ctx()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unread_payload_still_honours_timeout() {
        // Larger than a pipe buffer, so writing blocks until the program reads
        let task = Task::new("bulk", "analysis").with_attribute("blob", "x".repeat(100_000));
        let ctx = ExecutionContext {
            task,
            ..ctx()
        };
        let executor = CommandExecutor::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(200),
        );

        let started = std::time::Instant::now();
        let err = executor.execute(&ctx).await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let executor = CommandExecutor::new("/nonexistent/agent", Vec::new(), Duration::from_secs(1));
        assert!(matches!(
            executor.execute(&ctx()).await,
            Err(ReactorError::ExecutionFailed(_))
        ));
    }
}
