//! Subprocess-backed tool invoker

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use super::{InvocationResult, ToolInvoker};
use crate::config::HarnessConfig;
use crate::error::InvocationError;

/// Runs the tool as a child process under a wall-clock deadline
///
/// No retries: one call spawns at most one process. A timed-out child is
/// killed when its wait future is dropped.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ProcessInvoker {
    /// Create invoker for `program`
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
            timeout,
        }
    }

    /// Create invoker for the configured tool and timeout
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        let program = config.tool_path();
        let program = std::path::absolute(&program).unwrap_or(program);
        Self::new(program, config.timeout())
    }

    /// Run the child in `dir` instead of the current directory
    #[inline]
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Executable being invoked
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Per-invocation deadline
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, operation: &str, args: &[OsString]) -> Result<Output, InvocationError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(operation)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| InvocationError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(InvocationError::Wait {
                operation: operation.to_string(),
                source,
            }),
            Err(_elapsed) => Err(InvocationError::Timeout {
                operation: operation.to_string(),
                duration_secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, operation: &str, args: &[OsString]) -> InvocationResult {
        tracing::debug!(
            program = %self.program.display(),
            operation,
            args = ?args,
            "invoking tool"
        );

        let result = match self.run(operation, args).await {
            Ok(output) => InvocationResult {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                ..InvocationResult::default()
            },
            Err(e) => failure_result(operation, &e),
        };

        if result.succeeded() {
            tracing::debug!(operation, "tool returned success");
        } else if let Some(exit) = result.tool_exit() {
            tracing::warn!(operation, status = %exit, "tool reported failure");
        }
        if !result.stdout.is_empty() {
            tracing::debug!(operation, stdout = %result.stdout.trim_end(), "tool stdout");
        }
        if !result.stderr.is_empty() {
            tracing::debug!(operation, stderr = %result.stderr.trim_end(), "tool stderr");
        }
        result
    }
}

fn failure_result(operation: &str, error: &InvocationError) -> InvocationResult {
    match error {
        InvocationError::Timeout { .. } => {
            tracing::warn!(operation, error = %error, "tool invocation timed out");
            InvocationResult::timed_out()
        }
        InvocationError::Wait { .. } => {
            tracing::warn!(operation, error = %error, "tool output could not be collected");
            InvocationResult::collect_failed(error.to_string())
        }
        InvocationError::Spawn { .. } => {
            tracing::warn!(operation, error = %error, "tool invocation failed to run");
            InvocationResult::spawn_failed(error.to_string())
        }
    }
}
