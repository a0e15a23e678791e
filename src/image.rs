//! Pixel grids consumed by the pipeline
//!
//! [`Image`] holds gamma-encoded sRGB triples normalized to `[0, 1]`,
//! [`LabImage`] the derived CIELab triples. Both are row-major and immutable
//! once built.

use palette::Lab;

use crate::{AnalysisError, Result};

/// Immutable sRGB image, channels normalized to `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 3]>,
}

impl Image {
    /// Build an image from normalized RGB triples in row-major order
    ///
    /// Channel values are not range-checked here; conversion to Lab rejects
    /// anything outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if either dimension is zero or
    /// the buffer length does not match `width * height`.
    pub fn new(width: usize, height: usize, pixels: Vec<[f32; 3]>) -> Result<Self> {
        check_dimensions(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build an image from interleaved 8-bit RGB bytes
    pub fn from_rgb8(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 3 != 0 {
            return Err(AnalysisError::invalid_input(format!(
                "RGB buffer length {} is not a multiple of 3",
                bytes.len()
            )));
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|px| {
                [
                    f32::from(px[0]) / 255.0,
                    f32::from(px[1]) / 255.0,
                    f32::from(px[2]) / 255.0,
                ]
            })
            .collect();
        Self::new(width, height, pixels)
    }

    /// Build an image filled with a single 8-bit color
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Result<Self> {
        let px = [
            f32::from(rgb[0]) / 255.0,
            f32::from(rgb[1]) / 255.0,
            f32::from(rgb[2]) / 255.0,
        ];
        Self::new(width, height, vec![px; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always false for a constructed image; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[[f32; 3]] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> [f32; 3] {
        self.pixels[y * self.width + x]
    }
}

/// CIELab image derived from an [`Image`]
#[derive(Debug, Clone, PartialEq)]
pub struct LabImage {
    width: usize,
    height: usize,
    pixels: Vec<Lab>,
}

impl LabImage {
    /// Build a Lab image from row-major pixels
    pub fn new(width: usize, height: usize, pixels: Vec<Lab>) -> Result<Self> {
        check_dimensions(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Lab] {
        &self.pixels
    }

    /// Pixels as plain `[L, a, b]` arrays, the layout the filters work on
    pub fn to_arrays(&self) -> Vec<[f32; 3]> {
        self.pixels.iter().map(|p| [p.l, p.a, p.b]).collect()
    }
}

fn check_dimensions(width: usize, height: usize, len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(AnalysisError::invalid_input(format!(
            "image has zero dimension ({}x{})",
            width, height
        )));
    }
    let expected = width.checked_mul(height).ok_or_else(|| {
        AnalysisError::invalid_input(format!("image dimensions {}x{} overflow", width, height))
    })?;
    if len != expected {
        return Err(AnalysisError::invalid_input(format!(
            "pixel buffer holds {} pixels, expected {} for {}x{}",
            len, expected, width, height
        )));
    }
    Ok(())
}
