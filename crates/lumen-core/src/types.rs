//! Core data types for the Lumen enhancement pipeline.

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Number of bytes per interleaved RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded image held as interleaved RGBA bytes, row-major.
///
/// This is the unit of work passed between pipeline stages and across the
/// background execution boundary. A buffer is exclusively owned by whichever
/// stage currently holds it; crossing the worker boundary always moves or
/// copies it, never shares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// RGBA channel bytes, `width * height * 4` long
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer, validating that `data` matches the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, KernelError> {
        let buffer = Self {
            width,
            height,
            data,
        };
        buffer.check_geometry()?;
        Ok(buffer)
    }

    /// Create a buffer filled with a single RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Byte length implied by the stated dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Verify that `data` holds exactly `width * height` RGBA pixels.
    pub fn check_geometry(&self) -> Result<(), KernelError> {
        if self.data.len() != self.expected_len() {
            return Err(KernelError::Geometry {
                width: self.width,
                height: self.height,
                expected: self.expected_len(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Byte offset of the pixel at `(x, y)`.
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }
}

/// Stage intensities for one enhancement pass.
///
/// Each value is conventionally 0-100. A value of zero or less skips that
/// stage entirely. Out-of-range values are not clamped here; pixel output is
/// clamped regardless, keeping the intensities sane is the caller's job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementOptions {
    /// Unsharp mask strength
    pub sharpness: i32,

    /// Edge-preserving smoothing strength
    pub denoise: i32,

    /// Tonal contrast strength
    pub contrast: i32,
}

impl EnhancementOptions {
    /// True when every stage would be skipped.
    pub fn is_noop(&self) -> bool {
        self.sharpness <= 0 && self.denoise <= 0 && self.contrast <= 0
    }
}
