//! In-process LSB stub of the pxpl tool
//!
//! Speaks the tool's argument and exit-code contract. Layout: a 32-bit
//! little-endian length header followed by the payload, each byte emitted
//! least-significant bit first, one bit per color channel LSB in row-major
//! pixel order. Alpha never carries data.
//!
//! Fault knobs let tests force the failure paths the real tool would hit
//! only through bugs.

use std::ffi::OsString;
use std::path::Path;

use image::{DynamicImage, ImageError, ImageFormat};
use parking_lot::Mutex;
use pxpl_harness::invoker::{EMBED, EXTRACT};
use pxpl_harness::{InvocationResult, ToolInvoker};

const HEADER_BITS: u64 = 32;
const USABLE_CHANNELS: usize = 3;

const EXIT_ARGS: i32 = 1;
const EXIT_FORMAT: i32 = 2;
const EXIT_CAPACITY: i32 = 3;
const EXIT_IO: i32 = 4;
const EXIT_PNG: i32 = 5;

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: String,
    pub args: Vec<OsString>,
}

#[derive(Debug, Clone, Default)]
struct Faults {
    drop_alpha: bool,
    corrupt_byte: Option<usize>,
    truncate_to: Option<usize>,
    skip_output: Option<String>,
    fail: Option<(String, i32)>,
}

/// LSB stub implementing [`ToolInvoker`]
#[derive(Debug, Default)]
pub struct LsbStubTool {
    faults: Faults,
    calls: Mutex<Vec<RecordedCall>>,
}

impl LsbStubTool {
    /// Well-behaved stub
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write stego images without their alpha channel
    #[must_use]
    pub fn with_dropped_alpha(mut self) -> Self {
        self.faults.drop_alpha = true;
        self
    }

    /// Flip every bit of extracted byte `index`
    #[must_use]
    pub fn with_corrupted_byte(mut self, index: usize) -> Self {
        self.faults.corrupt_byte = Some(index);
        self
    }

    /// Cut extracted payloads to at most `len` bytes
    #[must_use]
    pub fn with_truncation(mut self, len: usize) -> Self {
        self.faults.truncate_to = Some(len);
        self
    }

    /// Report success for `operation` without writing its output file
    #[must_use]
    pub fn skipping_output(mut self, operation: &str) -> Self {
        self.faults.skip_output = Some(operation.to_string());
        self
    }

    /// Exit with `code` whenever `operation` is invoked
    #[must_use]
    pub fn failing(mut self, operation: &str, code: i32) -> Self {
        self.faults.fail = Some((operation.to_string(), code));
        self
    }

    /// Every call received so far
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls for `operation`
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.operation == operation).count()
    }

    fn embed(&self, args: &[OsString]) -> InvocationResult {
        let [cover, payload, output] = args else {
            return failure(EXIT_ARGS, "usage: embed <cover> <payload> <output>");
        };
        let image = match load(Path::new(cover)) {
            Ok(image) => image,
            Err(result) => return result,
        };
        let payload = match std::fs::read(payload) {
            Ok(bytes) => bytes,
            Err(e) => return failure(EXIT_IO, format!("cannot read payload: {e}")),
        };

        let keep_alpha = image.color().has_alpha() && !self.faults.drop_alpha;
        let (mut raster, stride, width, height) = raster_of(&image, keep_alpha);
        let pixels = u64::from(width) * u64::from(height);
        let capacity = capacity_bits(pixels);
        if payload.len() as u64 * 8 + HEADER_BITS > capacity {
            return failure(
                EXIT_CAPACITY,
                format!("payload of {} bytes exceeds capacity of {capacity} bits", payload.len()),
            );
        }

        let Ok(len) = u32::try_from(payload.len()) else {
            return failure(EXIT_CAPACITY, "payload too large");
        };
        let mut framed = len.to_le_bytes().to_vec();
        framed.extend_from_slice(&payload);
        write_bits(&mut raster, stride, &framed);

        if self.faults.skip_output.as_deref() == Some(EMBED) {
            return InvocationResult::exited(0, "", "");
        }
        match save(raster, stride, width, height, Path::new(output)) {
            Ok(()) => InvocationResult::exited(0, format!("embedded {} bytes", payload.len()), ""),
            Err(result) => result,
        }
    }

    fn extract(&self, args: &[OsString]) -> InvocationResult {
        let [stego, output] = args else {
            return failure(EXIT_ARGS, "usage: extract <stego> <output>");
        };
        let image = match load(Path::new(stego)) {
            Ok(image) => image,
            Err(result) => return result,
        };

        let keep_alpha = image.color().has_alpha();
        let (raster, stride, width, height) = raster_of(&image, keep_alpha);
        let capacity = capacity_bits(u64::from(width) * u64::from(height));
        if capacity < HEADER_BITS {
            return failure(EXIT_FORMAT, "image too small to hold a header");
        }

        let header = read_bits(&raster, stride, 0, 4);
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if u64::from(len) * 8 + HEADER_BITS > capacity {
            return failure(EXIT_FORMAT, format!("embedded size {len} exceeds capacity"));
        }
        let Ok(len) = usize::try_from(len) else {
            return failure(EXIT_FORMAT, "embedded size out of range");
        };

        let mut payload = read_bits(&raster, stride, HEADER_BITS as usize, len);
        if let Some(index) = self.faults.corrupt_byte {
            if let Some(byte) = payload.get_mut(index) {
                *byte = !*byte;
            }
        }
        if let Some(max) = self.faults.truncate_to {
            payload.truncate(max);
        }

        if self.faults.skip_output.as_deref() == Some(EXTRACT) {
            return InvocationResult::exited(0, "", "");
        }
        match std::fs::write(output, &payload) {
            Ok(()) => InvocationResult::exited(0, format!("extracted {} bytes", payload.len()), ""),
            Err(e) => failure(EXIT_IO, format!("cannot write output: {e}")),
        }
    }
}

#[async_trait::async_trait]
impl ToolInvoker for LsbStubTool {
    async fn invoke(&self, operation: &str, args: &[OsString]) -> InvocationResult {
        self.calls.lock().push(RecordedCall {
            operation: operation.to_string(),
            args: args.to_vec(),
        });
        tracing::debug!(operation, "stub tool invoked");

        if let Some((failing, code)) = &self.faults.fail {
            if failing == operation {
                return failure(*code, "forced failure");
            }
        }
        match operation {
            EMBED => self.embed(args),
            EXTRACT => self.extract(args),
            other => failure(EXIT_ARGS, format!("unknown operation {other}")),
        }
    }
}

/// Bits in the LSB plane of a cover with `pixels` pixels, header included
#[must_use]
pub fn capacity_bits(pixels: u64) -> u64 {
    pixels * USABLE_CHANNELS as u64
}

/// Largest payload the stub accepts for a cover of `pixels` pixels
#[must_use]
pub fn max_payload_len(pixels: u64) -> u64 {
    capacity_bits(pixels).saturating_sub(HEADER_BITS) / 8
}

fn failure(code: i32, message: impl Into<String>) -> InvocationResult {
    InvocationResult::exited(code, "", message)
}

fn load(path: &Path) -> Result<DynamicImage, InvocationResult> {
    image::open(path).map_err(|e| match e {
        ImageError::IoError(io) => {
            failure(EXIT_IO, format!("cannot read {}: {io}", path.display()))
        }
        other => failure(
            EXIT_FORMAT,
            format!("unsupported image {}: {other}", path.display()),
        ),
    })
}

fn raster_of(image: &DynamicImage, keep_alpha: bool) -> (Vec<u8>, usize, u32, u32) {
    let (width, height) = (image.width(), image.height());
    if keep_alpha {
        (image.to_rgba8().into_raw(), 4, width, height)
    } else {
        (image.to_rgb8().into_raw(), 3, width, height)
    }
}

fn save(
    raster: Vec<u8>,
    stride: usize,
    width: u32,
    height: u32,
    path: &Path,
) -> Result<(), InvocationResult> {
    let image = if stride == 4 {
        image::RgbaImage::from_raw(width, height, raster).map(DynamicImage::ImageRgba8)
    } else {
        image::RgbImage::from_raw(width, height, raster).map(DynamicImage::ImageRgb8)
    };
    let Some(image) = image else {
        return Err(failure(EXIT_PNG, "raster size mismatch"));
    };
    image.save_with_format(path, ImageFormat::Png).map_err(|e| match e {
        ImageError::IoError(io) => {
            failure(EXIT_IO, format!("cannot write {}: {io}", path.display()))
        }
        other => failure(EXIT_PNG, format!("png encoding failed: {other}")),
    })
}

fn channel_index(bit: usize, stride: usize) -> usize {
    (bit / USABLE_CHANNELS) * stride + bit % USABLE_CHANNELS
}

fn write_bits(raster: &mut [u8], stride: usize, data: &[u8]) {
    for (i, byte) in data.iter().enumerate() {
        for k in 0..8 {
            let idx = channel_index(i * 8 + k, stride);
            raster[idx] = (raster[idx] & !1) | ((byte >> k) & 1);
        }
    }
}

fn read_bits(raster: &[u8], stride: usize, start_bit: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| {
            (0..8).fold(0u8, |byte, k| {
                let idx = channel_index(start_bit + i * 8 + k, stride);
                byte | ((raster[idx] & 1) << k)
            })
        })
        .collect()
}
