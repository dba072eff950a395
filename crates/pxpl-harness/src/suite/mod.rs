//! Suite execution
//!
//! Scenarios run strictly in order, one at a time. A failing scenario never
//! stops the ones after it.

mod corpus;
mod cycle;

pub use self::corpus::{overflow_payload, Corpus, LEGACY_ARTIFACTS};
pub use self::cycle::{CycleReport, TestCycle};

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::cleaner::ArtifactManifest;
use crate::verifier::{
    Expectation, OutcomeReason, RoundTripVerifier, Scenario, VerificationOutcome,
};

/// Result of one scenario within a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub label: String,
    pub slug: String,
    pub expectation: Expectation,
    /// Outcome satisfied the expectation
    pub met: bool,
    pub outcome: VerificationOutcome,
}

/// Aggregate result of a suite run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteResult {
    pub passed_count: usize,
    pub total_count: usize,
    pub reports: Vec<ScenarioReport>,
}

impl SuiteResult {
    /// Suite passes iff every scenario met its expectation
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.passed_count == self.total_count
    }

    /// Scenarios that did not meet their expectation
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.reports.iter().filter(|r| !r.met)
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Steganography Round-Trip Results ===\n\n");
        for r in &self.reports {
            let mark = if r.met { "PASS" } else { "FAIL" };
            let _ = writeln!(report, "[{mark}] {}: {}", r.label, describe(r));
        }

        let _ = writeln!(report, "\nPassed: {}/{} tests", self.passed_count, self.total_count);
        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.succeeded() { "PASS" } else { "FAIL" }
        );
        report
    }
}

fn describe(report: &ScenarioReport) -> String {
    let outcome = &report.outcome;
    match (report.expectation, outcome.reason) {
        (Expectation::EmbedRejected(exit), OutcomeReason::EmbedFailed) if report.met => {
            format!("rejected as expected ({exit})")
        }
        (Expectation::EmbedRejected(exit), _) if outcome.passed => {
            format!("expected rejection ({exit}) but the round trip succeeded")
        }
        (_, OutcomeReason::RoundTripOk) => {
            let len = outcome.original_len.unwrap_or_default();
            match outcome.alpha_preserved {
                Some(true) => format!("round-trip ok ({len} bytes, alpha preserved)"),
                _ => format!("round-trip ok ({len} bytes)"),
            }
        }
        (_, reason) => match &outcome.detail {
            Some(detail) => format!("{reason}: {detail}"),
            None => reason.to_string(),
        },
    }
}

/// Runs scenarios through a verifier and tracks what they create
#[derive(Debug)]
pub struct SuiteRunner {
    verifier: RoundTripVerifier,
    manifest: ArtifactManifest,
}

impl SuiteRunner {
    /// Create runner with an empty manifest
    #[must_use]
    pub fn new(verifier: RoundTripVerifier) -> Self {
        Self::with_manifest(verifier, ArtifactManifest::new())
    }

    /// Create runner continuing an existing manifest
    #[must_use]
    pub fn with_manifest(verifier: RoundTripVerifier, manifest: ArtifactManifest) -> Self {
        Self { verifier, manifest }
    }

    /// Paths recorded so far
    #[inline]
    #[must_use]
    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    /// Give up the runner, keeping its manifest
    #[must_use]
    pub fn into_manifest(self) -> ArtifactManifest {
        self.manifest
    }

    /// Run every scenario in order
    pub async fn run(&mut self, scenarios: &[Scenario]) -> SuiteResult {
        let mut result = SuiteResult {
            total_count: scenarios.len(),
            ..SuiteResult::default()
        };
        let mut slugs = HashSet::new();

        for (index, scenario) in scenarios.iter().enumerate() {
            tracing::info!(
                scenario = %scenario.label,
                "running scenario {}/{}",
                index + 1,
                scenarios.len()
            );

            let slug = scenario.slug();
            let outcome = if slugs.insert(slug.clone()) {
                let paths = self.verifier.paths(scenario);
                self.manifest.record_all(paths.outputs());
                self.verifier.verify(scenario).await
            } else {
                tracing::warn!(
                    scenario = %scenario.label,
                    slug,
                    "artifact names collide with an earlier scenario"
                );
                VerificationOutcome::failed(
                    OutcomeReason::DuplicateLabel,
                    format!("artifact slug {slug} already used in this run"),
                )
            };

            let met = outcome.reason != OutcomeReason::DuplicateLabel
                && scenario.expectation.is_met(&outcome);
            if met {
                result.passed_count += 1;
            }
            result.reports.push(ScenarioReport {
                label: scenario.label.clone(),
                slug,
                expectation: scenario.expectation,
                met,
                outcome,
            });
        }

        tracing::info!(
            passed = result.passed_count,
            total = result.total_count,
            "suite finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fixtures::{ColorMode, ImageSpec, PatternKind, PayloadSpec};
    use crate::invoker::{InvocationResult, MockToolInvoker, ToolExit};

    fn scenario(label: &str) -> Scenario {
        Scenario::new(
            label,
            ImageSpec::new("c.png", 10, 10, ColorMode::Rgb, PatternKind::Checkerboard),
            PayloadSpec::text("p.txt", "Hi"),
        )
    }

    #[tokio::test]
    async fn duplicate_slug_is_refused_without_invoking() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockToolInvoker::new();
        // only the first scenario reaches the tool
        mock.expect_invoke()
            .times(1)
            .returning(|_, _| InvocationResult::exited(4, "", "cannot read"));
        let verifier = RoundTripVerifier::new(Arc::new(mock), dir.path());
        let mut runner = SuiteRunner::new(verifier);

        let result = runner.run(&[scenario("Small Test"), scenario("small-test")]).await;

        assert_eq!(result.total_count, 2);
        assert_eq!(result.passed_count, 0);
        assert_eq!(result.reports[1].outcome.reason, OutcomeReason::DuplicateLabel);
        assert_eq!(runner.manifest().len(), 2);
    }

    #[tokio::test]
    async fn expected_rejection_counts_as_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockToolInvoker::new();
        mock.expect_invoke()
            .times(1)
            .returning(|_, _| InvocationResult::exited(3, "", "too small"));
        let verifier = RoundTripVerifier::new(Arc::new(mock), dir.path());
        let mut runner = SuiteRunner::new(verifier);
        let negative = scenario("Overflow").expecting_rejection(ToolExit::CapacityExceeded);

        let result = runner.run(&[negative]).await;

        assert!(result.succeeded());
        let text = result.render_text();
        assert!(text.contains("[PASS] Overflow: rejected as expected"));
        assert!(text.contains("Passed: 1/1 tests"));
    }

    #[tokio::test]
    async fn outputs_recorded_before_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockToolInvoker::new();
        mock.expect_invoke()
            .times(1)
            .returning(|_, _| InvocationResult::timed_out());
        let verifier = RoundTripVerifier::new(Arc::new(mock), dir.path());
        let mut runner = SuiteRunner::new(verifier);

        let result = runner.run(&[scenario("Small")]).await;

        assert!(!result.succeeded());
        assert!(runner
            .manifest()
            .contains(&dir.path().join("demo_output_small.png")));
        assert!(runner
            .manifest()
            .contains(&dir.path().join("demo_extracted_small.bin")));
    }

    #[test]
    fn empty_suite_succeeds_and_serializes() {
        let result = SuiteResult::default();
        assert!(result.succeeded());
        let json = result.to_json().unwrap();
        assert!(json.contains("\"passed_count\": 0"));
    }
}
