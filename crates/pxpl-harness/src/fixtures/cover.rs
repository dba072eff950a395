//! Cover image fixtures
//!
//! Every pattern is a pure function of pixel coordinates and image size, and
//! the PNG encoder is lossless, so a spec maps to exactly one byte stream.
//! Alpha, when present, is always 255: no fixture has partial transparency,
//! which keeps alpha-preservation checks unambiguous.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use super::{write_fixture, ColorMode, FixtureBatch, GeneratedFixture, ImageSpec, PatternKind};
use crate::error::FixtureError;

/// Side length of one checkerboard square in pixels
const SQUARE: u32 = 10;

const LIGHT: [i64; 3] = [150, 200, 255];
const DARK: [i64; 3] = [25, 50, 100];

const GRAY_LIGHT: i64 = 200;
const GRAY_DARK: i64 = 50;

/// Ring width of the radial pattern, in whole distance units
const RING_PERIOD: i64 = 20;

/// Writes cover images into one output directory
#[derive(Debug, Clone)]
pub struct ImageFixtureGenerator {
    output_dir: PathBuf,
}

impl ImageFixtureGenerator {
    /// Create generator writing into `output_dir`
    #[inline]
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory fixtures are written to
    #[inline]
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the fixture for `spec` is written to
    #[inline]
    #[must_use]
    pub fn path_for(&self, spec: &ImageSpec) -> PathBuf {
        self.output_dir.join(&spec.name)
    }

    /// Render the raster for `spec` without touching disk
    ///
    /// # Errors
    /// Returns [`FixtureError::InvalidGeometry`] for zero-sized images and
    /// [`FixtureError::UnsupportedPattern`] for grayscale radial requests.
    pub fn render(spec: &ImageSpec) -> Result<DynamicImage, FixtureError> {
        let (width, height) = (spec.width, spec.height);
        if width == 0 || height == 0 {
            return Err(FixtureError::InvalidGeometry {
                name: spec.name.clone(),
                width,
                height,
            });
        }

        let image = match (spec.color_mode, spec.pattern) {
            (ColorMode::Rgb, PatternKind::Checkerboard) => {
                DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                    Rgb(checkerboard_pixel(x, y))
                }))
            }
            (ColorMode::Rgba, PatternKind::Checkerboard) => {
                DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                    opaque(checkerboard_pixel(x, y))
                }))
            }
            (ColorMode::Grayscale, PatternKind::Checkerboard) => {
                DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                    let level = grayscale_level(x, y);
                    Rgb([level, level, level])
                }))
            }
            (ColorMode::Rgb, PatternKind::Radial) => {
                DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                    Rgb(radial_pixel(x, y, width, height))
                }))
            }
            (ColorMode::Rgba, PatternKind::Radial) => {
                DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                    opaque(radial_pixel(x, y, width, height))
                }))
            }
            (mode @ ColorMode::Grayscale, pattern @ PatternKind::Radial) => {
                return Err(FixtureError::UnsupportedPattern {
                    name: spec.name.clone(),
                    mode,
                    pattern,
                });
            }
        };
        Ok(image)
    }

    /// Render and PNG-encode `spec`
    ///
    /// # Errors
    /// Returns any [`render`](Self::render) error, or
    /// [`FixtureError::Encode`] if the encoder rejects the raster.
    pub fn encode(spec: &ImageSpec) -> Result<Vec<u8>, FixtureError> {
        let image = Self::render(spec)?;
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|source| FixtureError::Encode {
                name: spec.name.clone(),
                source,
            })?;
        Ok(bytes)
    }

    /// Generate one cover image on disk
    ///
    /// # Errors
    /// Returns [`FixtureError`] when rendering, encoding or writing fails.
    pub fn generate(&self, spec: &ImageSpec) -> Result<GeneratedFixture, FixtureError> {
        let bytes = Self::encode(spec)?;
        let fixture = write_fixture(&self.path_for(spec), &bytes)?;
        tracing::info!(
            path = %fixture.path.display(),
            width = spec.width,
            height = spec.height,
            mode = ?spec.color_mode,
            pattern = ?spec.pattern,
            bytes = fixture.bytes_written,
            digest = %fixture.digest,
            "created cover image"
        );
        Ok(fixture)
    }

    /// Generate every spec, skipping (and logging) the ones that fail
    #[must_use]
    pub fn generate_all(&self, specs: &[ImageSpec]) -> FixtureBatch {
        let mut batch = FixtureBatch::default();
        for spec in specs {
            match self.generate(spec) {
                Ok(fixture) => batch.created.push(fixture),
                Err(e) => {
                    tracing::warn!(fixture = %spec.name, error = %e, "skipping cover image");
                    batch.skipped.push((spec.name.clone(), e));
                }
            }
        }
        batch
    }
}

/// Checkerboard color at `(x, y)` with the diagonal gradient applied
#[must_use]
pub fn checkerboard_pixel(x: u32, y: u32) -> [u8; 3] {
    let [r, g, b] = if is_light_square(x, y) { LIGHT } else { DARK };
    let (x, y) = (i64::from(x), i64::from(y));
    [clamp(r), clamp(g + x), clamp(b - 2 * y)]
}

/// Gray level of the grayscale checkerboard at `(x, y)`
#[must_use]
pub fn grayscale_level(x: u32, y: u32) -> u8 {
    let base = if is_light_square(x, y) {
        GRAY_LIGHT
    } else {
        GRAY_DARK
    };
    clamp(base - i64::from(y) + i64::from(x))
}

/// Radial pattern color at `(x, y)` for an image of `width` x `height`
#[must_use]
pub fn radial_pixel(x: u32, y: u32, width: u32, height: u32) -> [u8; 3] {
    let (cx, cy) = (f64::from(width / 2), f64::from(height / 2));
    let (fx, fy) = (f64::from(x), f64::from(y));
    let (w, h) = (f64::from(width), f64::from(height));
    let distance = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();

    if (distance as i64) % RING_PERIOD < RING_PERIOD / 2 {
        let red = 255.0 * (1.0 - distance / (w * 0.7));
        let green = 200.0 * (distance / (h * 0.7));
        let blue = 150.0 + 105.0 * (fx - fy).abs() / w.max(h);
        [trunc(red), trunc(green), trunc(blue)]
    } else {
        let red = 100.0 + 155.0 * (fx / w);
        let green = 50.0 + 200.0 * (fy / h);
        let blue = 25.0 + 100.0 * ((fx + fy) / (w + h));
        [trunc(red), trunc(green), trunc(blue)]
    }
}

#[inline]
fn is_light_square(x: u32, y: u32) -> bool {
    (x / SQUARE + y / SQUARE) % 2 == 0
}

#[inline]
fn opaque([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, u8::MAX])
}

#[inline]
fn clamp(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
}

/// Truncate toward zero, then clamp
#[inline]
fn trunc(value: f64) -> u8 {
    clamp(value as i64)
}
