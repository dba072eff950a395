//! Tool invocation
//!
//! The external tool is reached only through [`ToolInvoker`]. The production
//! implementation spawns a subprocess ([`ProcessInvoker`]); tests substitute
//! an in-process stub or a mock without touching the verifier or runner.

mod process;

pub use self::process::ProcessInvoker;

use std::ffi::OsString;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation name for hiding a payload
pub const EMBED: &str = "embed";

/// Operation name for recovering a payload
pub const EXTRACT: &str = "extract";

/// Runs one tool operation to completion
///
/// Implementations never fail: spawn errors and timeouts are reported
/// inside the returned [`InvocationResult`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Run `operation` with `args`, i.e. argv `[operation, ...args]`
    async fn invoke(&self, operation: &str, args: &[OsString]) -> InvocationResult;
}

/// Captured outcome of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Process exit code; absent on timeout, spawn or collection failure, or signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// Why the process could not be started
    pub spawn_error: Option<String>,
    /// Why the output of a started process could not be collected
    pub collect_error: Option<String>,
}

impl InvocationResult {
    /// Result of a process that exited with `code`
    #[must_use]
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    /// Result of a process killed at the deadline
    #[must_use]
    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    /// Result of a process that never ran
    #[must_use]
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self {
            spawn_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Result of a process that started but whose output was lost
    #[must_use]
    pub fn collect_failed(reason: impl Into<String>) -> Self {
        Self {
            collect_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Whether the operation succeeded (exit code zero)
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Classified exit code, if the process exited
    #[inline]
    #[must_use]
    pub fn tool_exit(&self) -> Option<ToolExit> {
        self.exit_code.map(ToolExit::from_code)
    }

    /// Overall classification of the invocation
    #[must_use]
    pub fn status(&self) -> InvocationStatus {
        if self.timed_out {
            return InvocationStatus::TimedOut;
        }
        if let Some(reason) = &self.spawn_error {
            return InvocationStatus::SpawnFailed(reason.clone());
        }
        if let Some(reason) = &self.collect_error {
            return InvocationStatus::CollectFailed(reason.clone());
        }
        match self.tool_exit() {
            Some(ToolExit::Success) => InvocationStatus::Success,
            Some(exit) => InvocationStatus::ToolFailure(exit),
            None => InvocationStatus::Terminated,
        }
    }
}

/// Classification of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatus {
    /// Exit code zero
    Success,
    /// Tool ran and reported failure
    ToolFailure(ToolExit),
    /// Deadline passed; the process was killed
    TimedOut,
    /// Process could not be started
    SpawnFailed(String),
    /// Process started but its exit status and output were lost
    CollectFailed(String),
    /// Process ended without an exit code (signal)
    Terminated,
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ToolFailure(exit) => write!(f, "{exit}"),
            Self::TimedOut => write!(f, "timed out"),
            Self::SpawnFailed(reason) => write!(f, "spawn failed: {reason}"),
            Self::CollectFailed(reason) => write!(f, "output collection failed: {reason}"),
            Self::Terminated => write!(f, "terminated by signal"),
        }
    }
}

/// Exit-code taxonomy of the tool
///
/// Diagnostic only: callers branch on zero / non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolExit {
    Success,
    BadArguments,
    UnsupportedImage,
    CapacityExceeded,
    Io,
    Encoding,
    Other(i32),
}

impl ToolExit {
    /// Classify a raw exit code
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::BadArguments,
            2 => Self::UnsupportedImage,
            3 => Self::CapacityExceeded,
            4 => Self::Io,
            5 => Self::Encoding,
            other => Self::Other(other),
        }
    }

    /// Raw exit code
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::BadArguments => 1,
            Self::UnsupportedImage => 2,
            Self::CapacityExceeded => 3,
            Self::Io => 4,
            Self::Encoding => 5,
            Self::Other(code) => code,
        }
    }

    /// Human-readable meaning
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BadArguments => "incorrect arguments",
            Self::UnsupportedImage => "unsupported or corrupt image",
            Self::CapacityExceeded => "cover image too small",
            Self::Io => "I/O error",
            Self::Encoding => "image encoding error",
            Self::Other(_) => "unclassified failure",
        }
    }
}

impl fmt::Display for ToolExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {}: {}", self.code(), self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_round_trips() {
        for code in -1..8 {
            assert_eq!(ToolExit::from_code(code).code(), code);
        }
        assert_eq!(ToolExit::from_code(3), ToolExit::CapacityExceeded);
        assert_eq!(ToolExit::from_code(42), ToolExit::Other(42));
    }

    #[test]
    fn display_names_code_and_meaning() {
        assert_eq!(
            ToolExit::CapacityExceeded.to_string(),
            "exit code 3: cover image too small"
        );
        assert_eq!(ToolExit::Other(9).describe(), "unclassified failure");
    }

    #[test]
    fn status_classification() {
        assert_eq!(InvocationResult::exited(0, "", "").status(), InvocationStatus::Success);
        assert_eq!(
            InvocationResult::exited(2, "", "bad png").status(),
            InvocationStatus::ToolFailure(ToolExit::UnsupportedImage)
        );
        assert_eq!(InvocationResult::timed_out().status(), InvocationStatus::TimedOut);
        assert!(matches!(
            InvocationResult::spawn_failed("no such file").status(),
            InvocationStatus::SpawnFailed(_)
        ));
        assert_eq!(InvocationResult::default().status(), InvocationStatus::Terminated);
    }

    #[test]
    fn collection_failure_is_not_a_spawn_failure() {
        let result = InvocationResult::collect_failed("broken pipe");

        assert!(!result.succeeded());
        assert!(result.spawn_error.is_none());
        assert_eq!(
            result.status(),
            InvocationStatus::CollectFailed("broken pipe".to_string())
        );
        assert_eq!(result.status().to_string(), "output collection failed: broken pipe");
        assert_eq!(
            InvocationResult::spawn_failed("no such file").status().to_string(),
            "spawn failed: no such file"
        );
    }

    #[test]
    fn only_zero_succeeds() {
        assert!(InvocationResult::exited(0, "", "").succeeded());
        assert!(!InvocationResult::exited(3, "", "").succeeded());
        assert!(!InvocationResult::timed_out().succeeded());
    }
}
