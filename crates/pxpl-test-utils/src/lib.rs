//! Testing utilities for the pxpl harness workspace
//!
//! Shared stub tool, temporary workspaces and scenario helpers.

#![allow(missing_docs)]

mod stub_tool;

pub use stub_tool::{capacity_bits, max_payload_len, LsbStubTool, RecordedCall};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pxpl_harness::{
    ColorMode, HarnessConfig, ImageFixtureGenerator, ImageSpec, PatternKind,
    PayloadFixtureGenerator, PayloadSpec, RoundTripVerifier, Scenario, ToolInvoker,
};
use tempfile::TempDir;

/// Temporary working directory with a matching configuration
#[derive(Debug)]
pub struct TestWorkspace {
    dir: TempDir,
    config: HarnessConfig,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::new()
            .with_project_root(dir.path())
            .with_work_dir(dir.path())
            .with_timeout_secs(5);
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Sorted names of the regular files directly inside the workspace
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Write the cover and payload fixtures a scenario needs
    pub fn materialize(&self, scenario: &Scenario) {
        ImageFixtureGenerator::new(self.path())
            .generate(&scenario.cover)
            .unwrap();
        PayloadFixtureGenerator::new(self.path())
            .generate(&scenario.payload)
            .unwrap();
    }

    pub fn verifier(&self, invoker: Arc<dyn ToolInvoker>) -> RoundTripVerifier {
        RoundTripVerifier::new(invoker, self.path())
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

pub fn rgb_cover(name: &str, width: u32, height: u32) -> ImageSpec {
    ImageSpec::new(name, width, height, ColorMode::Rgb, PatternKind::Checkerboard)
}

pub fn rgba_cover(name: &str, width: u32, height: u32) -> ImageSpec {
    ImageSpec::new(name, width, height, ColorMode::Rgba, PatternKind::Checkerboard)
}

pub fn radial_cover(name: &str, width: u32, height: u32) -> ImageSpec {
    ImageSpec::new(name, width, height, ColorMode::Rgb, PatternKind::Radial)
}

/// 50x50 RGB checkerboard carrying "Hi mom"
pub fn small_scenario() -> Scenario {
    Scenario::new(
        "Small",
        rgb_cover("sample_small.png", 50, 50),
        PayloadSpec::text("small_payload.txt", "Hi mom"),
    )
}

pub fn stub() -> Arc<LsbStubTool> {
    Arc::new(LsbStubTool::new())
}
