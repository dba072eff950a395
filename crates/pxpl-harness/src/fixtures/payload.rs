//! Payload fixtures
//!
//! Payload bytes are written exactly as specified: no text encoding step,
//! no line-ending normalisation.

use std::path::{Path, PathBuf};

use super::{write_fixture, FixtureBatch, GeneratedFixture, PayloadSpec};
use crate::error::FixtureError;

/// Writes payload files into one output directory
#[derive(Debug, Clone)]
pub struct PayloadFixtureGenerator {
    output_dir: PathBuf,
}

impl PayloadFixtureGenerator {
    /// Create generator writing into `output_dir`
    #[inline]
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory payloads are written to
    #[inline]
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the payload for `spec` is written to
    #[inline]
    #[must_use]
    pub fn path_for(&self, spec: &PayloadSpec) -> PathBuf {
        self.output_dir.join(&spec.name)
    }

    /// Write one payload file, returning its record
    ///
    /// # Errors
    /// Returns [`FixtureError::Write`] if the file cannot be written.
    pub fn generate(&self, spec: &PayloadSpec) -> Result<GeneratedFixture, FixtureError> {
        let fixture = write_fixture(&self.path_for(spec), &spec.content)?;
        tracing::info!(
            path = %fixture.path.display(),
            bytes = fixture.bytes_written,
            digest = %fixture.digest,
            "created payload"
        );
        Ok(fixture)
    }

    /// Write every payload, skipping failures
    ///
    /// The batch's [`FixtureBatch::total_bytes`] is the total payload data
    /// written.
    #[must_use]
    pub fn generate_all(&self, specs: &[PayloadSpec]) -> FixtureBatch {
        let mut batch = FixtureBatch::default();
        for spec in specs {
            match self.generate(spec) {
                Ok(fixture) => batch.created.push(fixture),
                Err(e) => {
                    tracing::warn!(fixture = %spec.name, error = %e, "skipping payload");
                    batch.skipped.push((spec.name.clone(), e));
                }
            }
        }
        tracing::info!(total_bytes = batch.total_bytes(), "payload corpus written");
        batch
    }
}
