//! The full `test` command: tool, fixtures, suite, cleanup

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Corpus, SuiteResult, SuiteRunner};
use crate::build::{BuildDriver, BuildProfile};
use crate::cleaner::{ArtifactCleaner, ArtifactManifest};
use crate::config::HarnessConfig;
use crate::error::{BuildError, HarnessError, Result};
use crate::fixtures::{ImageFixtureGenerator, PayloadFixtureGenerator};
use crate::invoker::{ProcessInvoker, ToolInvoker};
use crate::verifier::RoundTripVerifier;

/// Summary of one test cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Tool under test, when a subprocess tool was used
    pub tool: Option<PathBuf>,
    /// Tool had to be built first
    pub built: bool,
    pub fixtures_created: usize,
    /// Names of fixtures that could not be generated
    pub fixtures_skipped: Vec<String>,
    /// Hex SHA-256 of each generated fixture, by file name
    pub fixture_digests: BTreeMap<String, String>,
    pub payload_bytes: u64,
    pub suite: SuiteResult,
    pub files_removed: usize,
}

impl CycleReport {
    /// Cycle passes iff the suite passed
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.suite.succeeded()
    }

    /// Human-readable report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== pxpl Test Cycle ===\n");
        if let Some(tool) = &self.tool {
            let _ = writeln!(report, "Tool: {}", tool.display());
        }
        if self.built {
            report.push_str("Tool built before testing\n");
        }
        let _ = writeln!(report, "Fixtures created: {}", self.fixtures_created);
        for name in &self.fixtures_skipped {
            let _ = writeln!(report, "  skipped: {name}");
        }
        let _ = writeln!(report, "Total payload data: {} bytes", self.payload_bytes);
        let _ = writeln!(
            report,
            "Duration: {}ms\n",
            (self.finished_at - self.started_at).num_milliseconds()
        );
        report.push_str(&self.suite.render_text());
        let _ = writeln!(report, "\nCleanup: {} files removed", self.files_removed);
        report
    }
}

/// Orchestrates one complete `test` run
pub struct TestCycle {
    config: HarnessConfig,
    corpus: Corpus,
    invoker: Option<Arc<dyn ToolInvoker>>,
}

impl std::fmt::Debug for TestCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCycle")
            .field("config", &self.config)
            .field("scenarios", &self.corpus.scenarios.len())
            .field("custom_invoker", &self.invoker.is_some())
            .finish()
    }
}

impl TestCycle {
    /// Create cycle over the standard corpus
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            corpus: Corpus::standard(),
            invoker: None,
        }
    }

    /// Use a different corpus
    #[inline]
    #[must_use]
    pub fn with_corpus(mut self, corpus: Corpus) -> Self {
        self.corpus = corpus;
        self
    }

    /// Use `invoker` instead of spawning the resolved tool
    ///
    /// Tool resolution and building are skipped.
    #[inline]
    #[must_use]
    pub fn with_invoker(mut self, invoker: Arc<dyn ToolInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Corpus this cycle runs
    #[inline]
    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Run the cycle
    ///
    /// Once fixtures exist, cleanup always runs, whatever the suite result.
    ///
    /// # Errors
    /// Returns [`HarnessError`] if the tool is unavailable and cannot be
    /// built, or the working directory cannot be created.
    pub async fn run(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        let (invoker, tool, built) = self.prepare_invoker().await?;

        let work_dir = &self.config.work_dir;
        std::fs::create_dir_all(work_dir).map_err(|e| HarnessError::io(work_dir, e))?;

        let mut manifest = ArtifactManifest::new();
        let mut batch = ImageFixtureGenerator::new(work_dir).generate_all(&self.corpus.images);
        let payloads = PayloadFixtureGenerator::new(work_dir).generate_all(&self.corpus.payloads);
        let payload_bytes = payloads.total_bytes();
        batch.absorb(payloads);
        manifest.record_all(batch.paths());
        let fixture_digests = batch
            .created
            .iter()
            .map(|f| (fixture_name(&f.path), f.digest.clone()))
            .collect();

        let verifier = RoundTripVerifier::new(invoker, work_dir);
        let mut runner = SuiteRunner::with_manifest(verifier, manifest);
        let suite = runner.run(&self.corpus.scenarios).await;

        let cleaner = ArtifactCleaner::new(work_dir, self.corpus.artifact_names());
        let files_removed = cleaner.cleanup(runner.manifest());

        Ok(CycleReport {
            started_at,
            finished_at: Utc::now(),
            tool,
            built,
            fixtures_created: batch.created.len(),
            fixtures_skipped: batch.skipped.iter().map(|(name, _)| name.clone()).collect(),
            fixture_digests,
            payload_bytes,
            suite,
            files_removed,
        })
    }

    async fn prepare_invoker(&self) -> Result<(Arc<dyn ToolInvoker>, Option<PathBuf>, bool)> {
        if let Some(invoker) = &self.invoker {
            return Ok((Arc::clone(invoker), None, false));
        }

        let mut built = false;
        if !self.config.tool_path().is_file() {
            if !self.config.auto_build {
                return Err(BuildError::MissingExecutable(self.config.tool_path()).into());
            }
            tracing::info!(
                tool = %self.config.tool_path().display(),
                "tool not found; building"
            );
            BuildDriver::new(self.config.clone())
                .build(BuildProfile::Both)
                .await?;
            built = true;
        }

        let invoker = ProcessInvoker::from_config(&self.config);
        let tool = invoker.program().to_path_buf();
        tracing::info!(tool = %tool.display(), "using tool");
        Ok((Arc::new(invoker), Some(tool), built))
    }
}

fn fixture_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
