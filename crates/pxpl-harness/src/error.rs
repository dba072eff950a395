//! Error types for the pxpl harness
//!
//! Provides error handling for:
//! - Fixture generation (encoder rejection, write failure)
//! - Tool invocation (spawn failure, timeout)
//! - Build tool configure/build steps
//! - Configuration loading
//!
//! Tool failures and verification mismatches are not errors here: they are
//! recorded in [`crate::invoker::InvocationResult`] and
//! [`crate::verifier::VerificationOutcome`] so a scenario can fail without
//! aborting the suite.

use std::path::PathBuf;

use crate::fixtures::{ColorMode, PatternKind};

/// Main harness error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Fixture could not be produced
    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),

    /// External build tool failed
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem failure outside fixture generation
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error stops the current command outright
    ///
    /// Fixture errors only cost a single fixture; everything else means the
    /// command cannot continue.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Fixture(_))
    }
}

/// Errors while generating a fixture file
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// Zero-sized or otherwise unusable geometry
    #[error("invalid geometry for {name}: {width}x{height}")]
    InvalidGeometry {
        name: String,
        width: u32,
        height: u32,
    },

    /// Mode and pattern cannot be combined
    #[error("{name}: pattern {pattern:?} is not available in {mode:?} mode")]
    UnsupportedPattern {
        name: String,
        mode: ColorMode,
        pattern: PatternKind,
    },

    /// PNG encoder rejected the raster
    #[error("encoding {name} failed: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// Writing the fixture to disk failed
    #[error("writing {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FixtureError {
    /// Create write error for path
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Errors while running the external tool
///
/// Never escapes the invoker: it is folded into the invocation result.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// Process could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deadline passed before the process exited
    #[error("{operation} timed out after {duration_secs}s")]
    Timeout {
        operation: String,
        duration_secs: u64,
    },

    /// Waiting on the child failed
    #[error("failed to collect output of {operation}: {source}")]
    Wait {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the build tool configure/build steps
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Project root does not exist
    #[error("project directory not found: {0}")]
    ProjectNotFound(PathBuf),

    /// Build tool could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Configure step exited non-zero
    #[error("configure step failed with exit code {code:?}: {stderr}")]
    ConfigureFailed { code: Option<i32>, stderr: String },

    /// Build step exited non-zero
    #[error("build step failed with exit code {code:?}: {stderr}")]
    BuildFailed { code: Option<i32>, stderr: String },

    /// Build reported success but the executable is absent
    #[error("expected executable not found: {0}")]
    MissingExecutable(PathBuf),

    /// Build directory could not be prepared
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the harness
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Values are present but unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result alias for harness operations
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
