//! Round-trip verification
//!
//! One scenario = one embed + one extract. The contract under test is
//! `extract(embed(cover, payload)) == payload` byte for byte, plus alpha
//! preservation for covers that carry an alpha channel.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageDecoder;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::fixtures::{ImageSpec, PayloadSpec};
use crate::invoker::{ToolExit, ToolInvoker, EMBED, EXTRACT};

/// File name prefix of stego images written by the tool
pub const OUTPUT_PREFIX: &str = "demo_output_";

/// File name prefix of payloads recovered by the tool
pub const EXTRACTED_PREFIX: &str = "demo_extracted_";

/// One round-trip test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub label: String,
    pub cover: ImageSpec,
    pub payload: PayloadSpec,
    /// Check that an alpha channel in the cover survives embedding
    pub expect_alpha_check: bool,
    pub expectation: Expectation,
}

impl Scenario {
    /// Plain round-trip scenario
    #[must_use]
    pub fn new(label: impl Into<String>, cover: ImageSpec, payload: PayloadSpec) -> Self {
        Self {
            label: label.into(),
            cover,
            payload,
            expect_alpha_check: false,
            expectation: Expectation::RoundTrip,
        }
    }

    /// Also verify alpha preservation
    #[inline]
    #[must_use]
    pub fn with_alpha_check(mut self) -> Self {
        self.expect_alpha_check = true;
        self
    }

    /// Expect the embed step to be refused with `exit`
    #[inline]
    #[must_use]
    pub fn expecting_rejection(mut self, exit: ToolExit) -> Self {
        self.expectation = Expectation::EmbedRejected(exit);
        self
    }

    /// Filename-safe form of the label
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.label)
    }

    /// File name of the stego image for this scenario
    #[must_use]
    pub fn output_image_name(&self) -> String {
        format!("{OUTPUT_PREFIX}{}.png", self.slug())
    }

    /// File name of the extracted payload for this scenario
    #[must_use]
    pub fn extracted_payload_name(&self) -> String {
        format!("{EXTRACTED_PREFIX}{}.bin", self.slug())
    }
}

/// What a scenario must produce to count as passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expectation {
    /// Payload comes back byte-identical
    RoundTrip,
    /// Tool refuses the embed with this exit classification
    EmbedRejected(ToolExit),
}

impl Expectation {
    /// Whether `outcome` satisfies this expectation
    #[must_use]
    pub fn is_met(&self, outcome: &VerificationOutcome) -> bool {
        match self {
            Self::RoundTrip => outcome.passed,
            Self::EmbedRejected(exit) => {
                !outcome.passed
                    && outcome.reason == OutcomeReason::EmbedFailed
                    && outcome.tool_exit == Some(*exit)
            }
        }
    }
}

/// Why a verification ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeReason {
    RoundTripOk,
    EmbedFailed,
    AlphaLost,
    ExtractFailed,
    ContentMismatch,
    PayloadUnreadable,
    DuplicateLabel,
}

impl fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::RoundTripOk => "round-trip ok",
            Self::EmbedFailed => "embed failed",
            Self::AlphaLost => "alpha lost",
            Self::ExtractFailed => "extract failed",
            Self::ContentMismatch => "content mismatch",
            Self::PayloadUnreadable => "payload unreadable",
            Self::DuplicateLabel => "duplicate label",
        };
        f.write_str(text)
    }
}

/// Terminal result of verifying one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub passed: bool,
    /// First differing byte, within the shorter of the two payloads
    pub mismatch_offset: Option<usize>,
    /// Set when an alpha check ran on an alpha-carrying cover
    pub alpha_preserved: Option<bool>,
    pub reason: OutcomeReason,
    /// Classification of the failing tool call
    pub tool_exit: Option<ToolExit>,
    pub original_len: Option<usize>,
    pub extracted_len: Option<usize>,
    pub detail: Option<String>,
}

impl VerificationOutcome {
    /// Successful round trip
    #[must_use]
    pub fn round_trip_ok(len: usize, alpha_preserved: Option<bool>) -> Self {
        Self {
            passed: true,
            mismatch_offset: None,
            alpha_preserved,
            reason: OutcomeReason::RoundTripOk,
            tool_exit: None,
            original_len: Some(len),
            extracted_len: Some(len),
            detail: None,
        }
    }

    /// Failed verification
    #[must_use]
    pub fn failed(reason: OutcomeReason, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            mismatch_offset: None,
            alpha_preserved: None,
            reason,
            tool_exit: None,
            original_len: None,
            extracted_len: None,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    fn with_tool_exit(mut self, exit: Option<ToolExit>) -> Self {
        self.tool_exit = exit;
        self
    }

    #[must_use]
    fn with_alpha(mut self, preserved: Option<bool>) -> Self {
        self.alpha_preserved = preserved;
        self
    }
}

/// Files touched by one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPaths {
    pub cover: PathBuf,
    pub payload: PathBuf,
    pub output: PathBuf,
    pub extracted: PathBuf,
}

impl ScenarioPaths {
    /// Paths the tool is asked to create
    #[must_use]
    pub fn outputs(&self) -> [&Path; 2] {
        [&self.output, &self.extracted]
    }
}

/// Drives embed and extract for one scenario and judges the result
#[derive(Clone)]
pub struct RoundTripVerifier {
    invoker: Arc<dyn ToolInvoker>,
    work_dir: PathBuf,
}

impl fmt::Debug for RoundTripVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundTripVerifier")
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

impl RoundTripVerifier {
    /// Create verifier resolving files inside `work_dir`
    #[must_use]
    pub fn new(invoker: Arc<dyn ToolInvoker>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            invoker,
            work_dir: work_dir.into(),
        }
    }

    /// Working directory all scenario files live in
    #[inline]
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Resolve every file a scenario reads or writes
    #[must_use]
    pub fn paths(&self, scenario: &Scenario) -> ScenarioPaths {
        ScenarioPaths {
            cover: self.work_dir.join(&scenario.cover.name),
            payload: self.work_dir.join(&scenario.payload.name),
            output: self.work_dir.join(scenario.output_image_name()),
            extracted: self.work_dir.join(scenario.extracted_payload_name()),
        }
    }

    /// Verify one scenario
    pub async fn verify(&self, scenario: &Scenario) -> VerificationOutcome {
        let span = tracing::info_span!("verify", scenario = %scenario.label);
        let paths = self.paths(scenario);
        let outcome = self.run_steps(scenario, &paths).instrument(span).await;

        if outcome.passed {
            tracing::info!(scenario = %scenario.label, "round trip verified");
        } else {
            tracing::warn!(
                scenario = %scenario.label,
                reason = %outcome.reason,
                detail = outcome.detail.as_deref().unwrap_or_default(),
                "verification failed"
            );
        }
        outcome
    }

    async fn run_steps(&self, scenario: &Scenario, paths: &ScenarioPaths) -> VerificationOutcome {
        let cover_has_alpha = scenario.expect_alpha_check && cover_alpha(&paths.cover);

        let embed = self
            .invoker
            .invoke(
                EMBED,
                &[
                    paths.cover.clone().into_os_string(),
                    paths.payload.clone().into_os_string(),
                    paths.output.clone().into_os_string(),
                ],
            )
            .await;
        if !embed.succeeded() {
            let detail = embed.status().to_string();
            return VerificationOutcome::failed(OutcomeReason::EmbedFailed, detail)
                .with_tool_exit(embed.tool_exit());
        }
        if !paths.output.is_file() {
            return VerificationOutcome::failed(
                OutcomeReason::EmbedFailed,
                format!("output image {} was not created", paths.output.display()),
            );
        }

        let mut alpha_preserved = None;
        if cover_has_alpha {
            match has_alpha(&paths.output) {
                Ok(true) => alpha_preserved = Some(true),
                Ok(false) => {
                    return VerificationOutcome::failed(
                        OutcomeReason::AlphaLost,
                        "output image has no alpha channel",
                    )
                    .with_alpha(Some(false));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not inspect output image for alpha");
                }
            }
        }

        let extract_args: [OsString; 2] = [
            paths.output.clone().into_os_string(),
            paths.extracted.clone().into_os_string(),
        ];
        let extract = self.invoker.invoke(EXTRACT, &extract_args).await;
        if !extract.succeeded() {
            let detail = extract.status().to_string();
            return VerificationOutcome::failed(OutcomeReason::ExtractFailed, detail)
                .with_tool_exit(extract.tool_exit())
                .with_alpha(alpha_preserved);
        }
        if !paths.extracted.is_file() {
            return VerificationOutcome::failed(
                OutcomeReason::ExtractFailed,
                format!("extracted payload {} was not created", paths.extracted.display()),
            )
            .with_alpha(alpha_preserved);
        }

        let (original, extracted) = match (
            tokio::fs::read(&paths.payload).await,
            tokio::fs::read(&paths.extracted).await,
        ) {
            (Ok(original), Ok(extracted)) => (original, extracted),
            (Err(e), _) | (_, Err(e)) => {
                return VerificationOutcome::failed(OutcomeReason::PayloadUnreadable, e.to_string())
                    .with_alpha(alpha_preserved);
            }
        };

        compare_payloads(&original, &extracted, alpha_preserved)
    }
}

/// Judge extracted bytes against the original
#[must_use]
pub fn compare_payloads(
    original: &[u8],
    extracted: &[u8],
    alpha_preserved: Option<bool>,
) -> VerificationOutcome {
    let offset = first_mismatch(original, extracted);
    if offset.is_none() && original.len() == extracted.len() {
        return VerificationOutcome::round_trip_ok(original.len(), alpha_preserved);
    }

    let detail = match offset {
        Some(at) => format!(
            "first difference at byte {at}: original {:#04x}, extracted {:#04x}",
            original[at], extracted[at]
        ),
        None => format!(
            "length differs: original {} bytes, extracted {} bytes",
            original.len(),
            extracted.len()
        ),
    };
    VerificationOutcome {
        passed: false,
        mismatch_offset: offset,
        alpha_preserved,
        reason: OutcomeReason::ContentMismatch,
        tool_exit: None,
        original_len: Some(original.len()),
        extracted_len: Some(extracted.len()),
        detail: Some(detail),
    }
}

/// Offset of the first differing byte within the shorter slice
#[must_use]
pub fn first_mismatch(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter().zip(b).position(|(x, y)| x != y)
}

/// Whether the image at `path` carries an alpha channel
///
/// Reads only the header.
///
/// # Errors
/// Returns [`image::ImageError`] if the file cannot be opened or decoded.
pub fn has_alpha(path: &Path) -> Result<bool, image::ImageError> {
    let decoder = image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    Ok(decoder.color_type().has_alpha())
}

fn cover_alpha(path: &Path) -> bool {
    match has_alpha(path) {
        Ok(alpha) => {
            tracing::info!(path = %path.display(), alpha, "cover alpha channel");
            alpha
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not inspect cover image");
            false
        }
    }
}

fn slugify(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
