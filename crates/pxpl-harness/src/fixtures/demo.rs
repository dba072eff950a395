//! Illustrative cover image for the `demo` command
//!
//! Not part of any verification scenario.

use std::path::Path;

use image::{Rgb, RgbImage};

use super::{write_fixture, GeneratedFixture};
use crate::error::FixtureError;

const SIZE: u32 = 200;
const LIGHT_BLUE: Rgb<u8> = Rgb([173, 216, 230]);
const DARK_BLUE: Rgb<u8> = Rgb([0, 0, 139]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Ellipse bounding box `[x0, y0, x1, y1]`
const ELLIPSE: [u32; 4] = [50, 50, 150, 150];
/// Rectangle outline box `[x0, y0, x1, y1]`, inclusive
const FRAME: [u32; 4] = [25, 25, 175, 175];
const FRAME_WIDTH: u32 = 3;

/// 200x200 light-blue cover with a dark-blue disc and a red frame
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoImage;

impl DemoImage {
    /// Draw the demo raster
    #[must_use]
    pub fn render() -> RgbImage {
        RgbImage::from_fn(SIZE, SIZE, |x, y| {
            if in_frame(x, y) {
                RED
            } else if in_ellipse(x, y) {
                DARK_BLUE
            } else {
                LIGHT_BLUE
            }
        })
    }

    /// Write the demo cover as PNG to `path`
    ///
    /// # Errors
    /// Returns [`FixtureError`] if encoding or writing fails.
    pub fn write(path: &Path) -> Result<GeneratedFixture, FixtureError> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(Self::render())
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|source| FixtureError::Encode {
                name: path.display().to_string(),
                source,
            })?;
        let fixture = write_fixture(path, &bytes)?;
        tracing::info!(
            path = %path.display(),
            digest = %fixture.digest,
            "created demo cover image"
        );
        Ok(fixture)
    }
}

fn in_ellipse(x: u32, y: u32) -> bool {
    let [x0, y0, x1, y1] = ELLIPSE.map(f64::from);
    let (rx, ry) = ((x1 - x0) / 2.0, (y1 - y0) / 2.0);
    let (cx, cy) = (x0 + rx, y0 + ry);
    // sample at the pixel center
    let dx = (f64::from(x) + 0.5 - cx) / rx;
    let dy = (f64::from(y) + 0.5 - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

fn in_frame(x: u32, y: u32) -> bool {
    let [x0, y0, x1, y1] = FRAME;
    let inside = (x0..=x1).contains(&x) && (y0..=y1).contains(&y);
    let interior = (x0 + FRAME_WIDTH..=x1 - FRAME_WIDTH).contains(&x)
        && (y0 + FRAME_WIDTH..=y1 - FRAME_WIDTH).contains(&y);
    inside && !interior
}
