//! Artifact cleanup
//!
//! Removal sources, in order:
//! 1. the explicit manifest recorded during the run
//! 2. the closed set of names the corpus can produce
//! 3. a non-recursive sweep for `demo_output_*` / `demo_extracted_*` files
//!
//! Missing files are not an error, so running cleanup twice is harmless.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::verifier::{EXTRACTED_PREFIX, OUTPUT_PREFIX};

const SWEEP_PATTERN: &str = r"^demo_(output|extracted)_[a-z0-9_]+\.(png|bin|txt)$";

/// Every path created, or requested from the tool, during one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactManifest {
    paths: BTreeSet<PathBuf>,
}

impl ArtifactManifest {
    /// Create empty manifest
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one path
    pub fn record(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    /// Record several paths
    pub fn record_all<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
    }

    /// Check if a path was recorded
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Recorded paths in order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Number of recorded paths
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Removes harness artifacts from one working directory
#[derive(Debug, Clone)]
pub struct ArtifactCleaner {
    work_dir: PathBuf,
    known_names: Vec<String>,
}

impl ArtifactCleaner {
    /// Create cleaner for `work_dir` with the given known file names
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>, known_names: Vec<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            known_names,
        }
    }

    /// Directory being cleaned
    #[inline]
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Remove every artifact, returning how many files were deleted
    pub fn cleanup(&self, manifest: &ArtifactManifest) -> usize {
        let mut targets: Vec<PathBuf> = Vec::new();
        let mut seen = BTreeSet::new();
        let candidates = manifest
            .iter()
            .map(Path::to_path_buf)
            .chain(self.known_names.iter().map(|n| self.work_dir.join(n)))
            .chain(self.sweep());
        for path in candidates {
            if seen.insert(path.clone()) {
                targets.push(path);
            }
        }

        let mut removed = 0;
        for path in &targets {
            match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "removed artifact");
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove artifact");
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "cleanup complete");
        } else {
            tracing::info!("no files to clean up");
        }
        removed
    }

    /// Scenario outputs present in the working directory
    fn sweep(&self) -> Vec<PathBuf> {
        let pattern = match Regex::new(SWEEP_PATTERN) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!(error = %e, "sweep pattern rejected; skipping sweep");
                return Vec::new();
            }
        };
        let entries = match std::fs::read_dir(&self.work_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.work_dir.display(), error = %e, "cannot list work dir");
                return Vec::new();
            }
        };

        entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter(|entry| {
                entry.file_name().to_str().is_some_and(|name| {
                    (name.starts_with(OUTPUT_PREFIX) || name.starts_with(EXTRACTED_PREFIX))
                        && pattern.is_match(name)
                })
            })
            .map(|entry| entry.path())
            .collect()
    }
}
