//! Build tool driver
//!
//! Configures and builds the tool out of tree. The build tool is an opaque
//! command: it either succeeds or the step's stderr is reported.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::HarnessConfig;
use crate::error::BuildError;

/// Which executables a build must produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProfile {
    /// Command-line tool only
    CliOnly,
    /// Command-line tool and GUI
    Both,
}

impl BuildProfile {
    fn configure_options(self) -> &'static [&'static str] {
        match self {
            Self::CliOnly => &[],
            Self::Both => &["-DBUILD_BOTH=ON"],
        }
    }
}

/// Output of a successful build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub profile: BuildProfile,
    /// Executables verified after the build
    pub executables: Vec<PathBuf>,
    pub configure_stdout: String,
    pub build_stdout: String,
}

/// Runs configure + build through the configured build tool
#[derive(Debug, Clone)]
pub struct BuildDriver {
    config: HarnessConfig,
}

impl BuildDriver {
    /// Create driver from harness configuration
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Arguments of the configure step
    #[must_use]
    pub fn configure_args(&self, profile: BuildProfile) -> Vec<OsString> {
        let project = std::path::absolute(&self.config.project_root)
            .unwrap_or_else(|_| self.config.project_root.clone());
        let mut args = vec![OsString::from(format!(
            "-DCMAKE_BUILD_TYPE={}",
            self.config.build.build_type
        ))];
        args.extend(profile.configure_options().iter().map(OsString::from));
        args.push(project.into_os_string());
        args
    }

    /// Arguments of the build step
    #[must_use]
    pub fn build_args(&self) -> Vec<OsString> {
        ["--build", ".", "--config", self.config.build.build_type.as_str()]
            .iter()
            .map(OsString::from)
            .collect()
    }

    /// Executables `profile` must leave behind
    #[must_use]
    pub fn expected_executables(&self, profile: BuildProfile) -> Vec<PathBuf> {
        match profile {
            BuildProfile::CliOnly => vec![self.config.tool_path()],
            BuildProfile::Both => vec![self.config.tool_path(), self.config.gui_tool_path()],
        }
    }

    /// Configure, build and verify the executables
    ///
    /// # Errors
    /// Returns [`BuildError`] if the project is missing, a step fails or
    /// an expected executable is absent afterwards.
    pub async fn build(&self, profile: BuildProfile) -> Result<BuildReport, BuildError> {
        let project = &self.config.project_root;
        if !project.is_dir() {
            return Err(BuildError::ProjectNotFound(project.clone()));
        }
        let build_dir = self.config.build_dir();
        std::fs::create_dir_all(&build_dir).map_err(|source| BuildError::Io {
            path: build_dir.clone(),
            source,
        })?;

        tracing::info!(?profile, dir = %build_dir.display(), "configuring build");
        let configure = self.step(&build_dir, &self.configure_args(profile)).await?;
        if !configure.status.success() {
            return Err(BuildError::ConfigureFailed {
                code: configure.status.code(),
                stderr: String::from_utf8_lossy(&configure.stderr).trim_end().to_string(),
            });
        }

        tracing::info!("building");
        let build = self.step(&build_dir, &self.build_args()).await?;
        if !build.status.success() {
            return Err(BuildError::BuildFailed {
                code: build.status.code(),
                stderr: String::from_utf8_lossy(&build.stderr).trim_end().to_string(),
            });
        }

        let executables = self.expected_executables(profile);
        if let Some(missing) = executables.iter().find(|p| !p.is_file()) {
            return Err(BuildError::MissingExecutable(missing.clone()));
        }
        for exe in &executables {
            tracing::info!(path = %exe.display(), "executable found");
        }

        Ok(BuildReport {
            profile,
            executables,
            configure_stdout: String::from_utf8_lossy(&configure.stdout).into_owned(),
            build_stdout: String::from_utf8_lossy(&build.stdout).into_owned(),
        })
    }

    async fn step(
        &self,
        dir: &Path,
        args: &[OsString],
    ) -> Result<std::process::Output, BuildError> {
        let program = &self.config.build.program;
        tracing::debug!(program, args = ?args, "running build step");
        Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: program.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_args_per_profile() {
        let driver = BuildDriver::new(HarnessConfig::new().with_project_root("/src/pxpl"));

        let cli = driver.configure_args(BuildProfile::CliOnly);
        assert_eq!(cli.len(), 2);
        assert_eq!(cli[0], "-DCMAKE_BUILD_TYPE=Release");
        assert_eq!(cli[1], "/src/pxpl");

        let both = driver.configure_args(BuildProfile::Both);
        assert_eq!(both[1], "-DBUILD_BOTH=ON");
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn build_args_use_build_type() {
        let driver = BuildDriver::new(HarnessConfig::new());
        assert_eq!(driver.build_args(), ["--build", ".", "--config", "Release"]);
    }

    #[test]
    fn both_profile_expects_gui() {
        let driver = BuildDriver::new(HarnessConfig::new().with_project_root("/p"));
        let exes = driver.expected_executables(BuildProfile::Both);
        assert_eq!(exes.len(), 2);
        assert!(exes[1].to_string_lossy().contains("pxpl-gui"));
    }

    #[tokio::test]
    async fn missing_project_rejected() {
        let driver = BuildDriver::new(HarnessConfig::new().with_project_root("/no/such/project"));
        let err = driver.build(BuildProfile::CliOnly).await.unwrap_err();
        assert!(matches!(err, BuildError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn missing_build_tool_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HarnessConfig::new().with_project_root(dir.path());
        config.build.program = "/no/such/cmake".to_string();

        let err = BuildDriver::new(config).build(BuildProfile::CliOnly).await.unwrap_err();

        assert!(matches!(err, BuildError::Spawn { .. }));
        assert!(dir.path().join("build").is_dir());
    }
}
