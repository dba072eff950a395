//! Harness configuration
//!
//! All path resolution happens here, once. Components receive the
//! configuration (or the values derived from it) explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Base name of the CLI tool under test
pub const TOOL_NAME: &str = "pxpl";

/// Base name of the GUI build of the tool
pub const GUI_TOOL_NAME: &str = "pxpl-gui";

/// Default per-invocation timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root of the tool's source tree (build runs here)
    pub project_root: PathBuf,
    /// Directory fixtures and tool outputs are written to
    pub work_dir: PathBuf,
    /// Explicit tool executable, bypassing candidate lookup
    pub tool_path: Option<PathBuf>,
    /// Explicit GUI executable, bypassing candidate lookup
    pub gui_tool_path: Option<PathBuf>,
    /// Wall-clock limit per tool invocation
    pub timeout_secs: u64,
    /// Build the tool before `test` when it is missing
    pub auto_build: bool,
    /// Build tool settings
    pub build: BuildConfig,
    /// Where `demo` writes its cover image
    pub demo_path: Option<PathBuf>,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Reject values no component can work with
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        if self.build.program.trim().is_empty() {
            return Err(ConfigError::Invalid("build.program must not be empty".into()));
        }
        Ok(())
    }

    /// With project root
    #[inline]
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// With working directory
    #[inline]
    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// With explicit tool path
    #[inline]
    #[must_use]
    pub fn with_tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_path = Some(path.into());
        self
    }

    /// With invocation timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// With auto-build toggle
    #[inline]
    #[must_use]
    pub fn with_auto_build(mut self, enabled: bool) -> Self {
        self.auto_build = enabled;
        self
    }

    /// Invocation timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Places the CLI tool is looked for, in priority order
    #[must_use]
    pub fn tool_candidates(&self) -> Vec<PathBuf> {
        self.candidates_for(TOOL_NAME)
    }

    /// Resolved CLI tool path
    ///
    /// The explicit override wins; otherwise the first existing candidate,
    /// falling back to the first candidate so error messages name a path.
    #[must_use]
    pub fn tool_path(&self) -> PathBuf {
        self.resolve(self.tool_path.as_ref(), TOOL_NAME)
    }

    /// Resolved GUI tool path
    #[must_use]
    pub fn gui_tool_path(&self) -> PathBuf {
        self.resolve(self.gui_tool_path.as_ref(), GUI_TOOL_NAME)
    }

    /// Directory the build tool runs in
    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.build
            .build_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join("build"))
    }

    /// Output path of the demo cover image
    #[must_use]
    pub fn demo_path(&self) -> PathBuf {
        self.demo_path
            .clone()
            .unwrap_or_else(|| self.project_root.join("demo_cover.png"))
    }

    fn candidates_for(&self, base: &str) -> Vec<PathBuf> {
        let file = format!("{base}{}", std::env::consts::EXE_SUFFIX);
        vec![
            self.project_root.join("release").join(&file),
            self.build_dir().join(&self.build.build_type).join(&file),
        ]
    }

    fn resolve(&self, explicit: Option<&PathBuf>, base: &str) -> PathBuf {
        if let Some(path) = explicit {
            return path.clone();
        }
        let candidates = self.candidates_for(base);
        candidates
            .iter()
            .find(|p| p.is_file())
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(base))
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            work_dir: PathBuf::from("."),
            tool_path: None,
            gui_tool_path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auto_build: true,
            build: BuildConfig::default(),
            demo_path: None,
        }
    }
}

/// Build tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build tool executable
    pub program: String,
    /// Out-of-tree build directory (defaults to `<project>/build`)
    pub build_dir: Option<PathBuf>,
    /// Build configuration name
    pub build_type: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: "cmake".to_string(),
            build_dir: None,
            build_type: "Release".to_string(),
        }
    }
}
