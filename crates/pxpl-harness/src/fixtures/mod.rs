//! Fixture generation
//!
//! Synthetic cover images and payload files with reproducible recipes:
//! the same spec always produces the same bytes on disk.

mod cover;
mod demo;
mod payload;

pub use self::cover::{checkerboard_pixel, grayscale_level, radial_pixel, ImageFixtureGenerator};
pub use self::demo::DemoImage;
pub use self::payload::PayloadFixtureGenerator;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::FixtureError;

/// Channel layout of a cover image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMode {
    /// Three 8-bit channels
    Rgb,
    /// Three color channels plus fully opaque alpha
    Rgba,
    /// Gray levels stored as RGB with R=G=B
    Grayscale,
}

impl ColorMode {
    /// Whether images in this mode carry an alpha channel
    #[inline]
    #[must_use]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba)
    }

    /// Channels stored per pixel in the written PNG
    #[inline]
    #[must_use]
    pub fn stored_channels(self) -> u64 {
        match self {
            Self::Rgba => 4,
            Self::Rgb | Self::Grayscale => 3,
        }
    }

    /// Channels that can carry payload bits (alpha excluded)
    #[inline]
    #[must_use]
    pub fn usable_channels(self) -> u64 {
        self.stored_channels() - u64::from(self.has_alpha())
    }
}

/// Visual pattern drawn into a cover image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// 10px squares with a diagonal gradient
    Checkerboard,
    /// Concentric rings over a positional gradient
    Radial,
}

/// Recipe for one cover image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSpec {
    /// File name inside the working directory
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
    pub pattern: PatternKind,
}

impl ImageSpec {
    /// Create image spec
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        color_mode: ColorMode,
        pattern: PatternKind,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            color_mode,
            pattern,
        }
    }

    /// Number of bits in the image's LSB plane (alpha excluded)
    ///
    /// This is the raw plane size; the tool reserves part of it for its own
    /// length header, so the usable payload is strictly smaller.
    #[inline]
    #[must_use]
    pub fn lsb_plane_bits(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * self.color_mode.usable_channels()
    }

    /// LSB plane size in whole bytes
    #[inline]
    #[must_use]
    pub fn lsb_plane_bytes(&self) -> u64 {
        self.lsb_plane_bits() / 8
    }
}

/// Recipe for one payload file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayloadSpec {
    /// File name inside the working directory
    pub name: String,
    /// Exact bytes written to disk
    pub content: Vec<u8>,
}

impl PayloadSpec {
    /// Payload holding literal text
    #[must_use]
    pub fn text(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            content: text.as_bytes().to_vec(),
        }
    }

    /// Payload of `byte(i mod 256)` for `i` in `0..len`
    ///
    /// With `len >= 256` every byte value appears at least once.
    #[must_use]
    pub fn byte_range(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            content: (0..len).map(|i| (i % 256) as u8).collect(),
        }
    }

    /// Printable filler of exactly `len` bytes
    #[must_use]
    pub fn filler(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            content: (0..len).map(|i| b' ' + (i % 95) as u8).collect(),
        }
    }

    /// Payload length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Record of a fixture file written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFixture {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Hex SHA-256 of the written bytes
    pub digest: String,
}

/// Outcome of generating a batch of fixtures
#[derive(Debug, Default)]
pub struct FixtureBatch {
    /// Fixtures written successfully
    pub created: Vec<GeneratedFixture>,
    /// Fixtures skipped, with the reason
    pub skipped: Vec<(String, FixtureError)>,
}

impl FixtureBatch {
    /// Total bytes written across the batch
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.created.iter().map(|f| f.bytes_written).sum()
    }

    /// Paths of every created fixture
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.created.iter().map(|f| f.path.as_path())
    }

    /// Merge another batch into this one
    pub fn absorb(&mut self, other: FixtureBatch) {
        self.created.extend(other.created);
        self.skipped.extend(other.skipped);
    }
}

/// Hex SHA-256 of a byte slice
#[must_use]
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write fixture bytes verbatim and describe the result
pub(crate) fn write_fixture(path: &Path, bytes: &[u8]) -> Result<GeneratedFixture, FixtureError> {
    std::fs::write(path, bytes).map_err(|e| FixtureError::write(path, e))?;
    Ok(GeneratedFixture {
        path: path.to_path_buf(),
        bytes_written: bytes.len() as u64,
        digest: digest_hex(bytes),
    })
}
