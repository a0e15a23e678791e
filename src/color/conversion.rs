//! Color space conversion utilities
//!
//! Provides the conversions every pipeline stage depends on:
//! - gamma-encoded sRGB to CIELab (D65) via linear RGB and XYZ
//! - Lab back to sRGB with gamut clamping
//! - sRGB to subtractive CMYK
//! - Hex color representation
//!
//! Every conversion validates its input domain and fails with
//! `AnalysisError::InvalidColorRange` instead of producing NaNs.

use palette::{FromColor, Lab, Srgb};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::domain;
use crate::image::{Image, LabImage};
use crate::{AnalysisError, Result};

/// Slack on the Lab domain for f32 round-off at the gamut corners
const LAB_TOLERANCE: f32 = 1e-3;

/// Subtractive color in percent (0-100 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cmyk {
    pub cyan: f32,
    pub magenta: f32,
    pub yellow: f32,
    pub key: f32,
}

impl Cmyk {
    /// Channels as a `[c, m, y, k]` quadruple
    pub fn to_array(self) -> [f32; 4] {
        [self.cyan, self.magenta, self.yellow, self.key]
    }
}

/// Stateless color converter, D65 reference white throughout
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConverter;

impl ColorConverter {
    /// Create a new color converter
    pub fn new() -> Self {
        Self
    }

    /// Convert one normalized sRGB triple to Lab
    ///
    /// The palette crate performs the standard chain: inverse sRGB gamma,
    /// the sRGB-to-XYZ matrix, then the CIELab transfer functions against D65.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidColorRange` if a channel is outside `[0, 1]`
    /// or not finite.
    pub fn rgb_to_lab(&self, rgb: [f32; 3]) -> Result<Lab> {
        check_channel("red", rgb[0], domain::RGB_MIN, domain::RGB_MAX, "[0, 1]")?;
        check_channel("green", rgb[1], domain::RGB_MIN, domain::RGB_MAX, "[0, 1]")?;
        check_channel("blue", rgb[2], domain::RGB_MIN, domain::RGB_MAX, "[0, 1]")?;
        Ok(Lab::from_color(Srgb::new(rgb[0], rgb[1], rgb[2])))
    }

    /// Convert RGB (0-255) to Lab; 8-bit input is always in range
    pub fn rgb8_to_lab(&self, r: u8, g: u8, b: u8) -> Lab {
        let srgb = Srgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        );
        Lab::from_color(srgb)
    }

    /// Convert a whole image to Lab
    ///
    /// Fails on the first pixel with an out-of-range channel.
    pub fn to_lab(&self, image: &Image) -> Result<LabImage> {
        let pixels = image
            .pixels()
            .par_iter()
            .map(|&px| self.rgb_to_lab(px))
            .collect::<Result<Vec<Lab>>>()?;
        LabImage::new(image.width(), image.height(), pixels)
    }

    /// Convert Lab to sRGB, clamped to the displayable gamut
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidColorRange` if L is outside `[0, 100]`,
    /// a/b outside `[-128, 128]`, or any component is not finite.
    pub fn lab_to_rgb(&self, lab: Lab) -> Result<Srgb> {
        let (l_min, l_max) = (domain::L_MIN - LAB_TOLERANCE, domain::L_MAX + LAB_TOLERANCE);
        let (ab_min, ab_max) = (domain::AB_MIN - LAB_TOLERANCE, domain::AB_MAX + LAB_TOLERANCE);
        check_channel("L", lab.l, l_min, l_max, "[0, 100]")?;
        check_channel("a", lab.a, ab_min, ab_max, "[-128, 128]")?;
        check_channel("b", lab.b, ab_min, ab_max, "[-128, 128]")?;

        let srgb = Srgb::from_color(lab);
        Ok(Srgb::new(
            srgb.red.clamp(0.0, 1.0),
            srgb.green.clamp(0.0, 1.0),
            srgb.blue.clamp(0.0, 1.0),
        ))
    }

    /// Convert Lab to an 8-bit RGB triple
    pub fn lab_to_rgb8(&self, lab: Lab) -> Result<[u8; 3]> {
        let srgb = self.lab_to_rgb(lab)?;
        Ok(srgb_to_rgb8(srgb))
    }

    /// Convert sRGB to CMYK using the naive subtractive model
    ///
    /// K = 1 - max(R, G, B); C, M, Y are the remaining channel deficits scaled
    /// by 1 / (1 - K). Pure black maps to (0, 0, 0, 100).
    pub fn rgb_to_cmyk(&self, srgb: Srgb) -> Result<Cmyk> {
        check_channel("red", srgb.red, domain::RGB_MIN, domain::RGB_MAX, "[0, 1]")?;
        check_channel("green", srgb.green, domain::RGB_MIN, domain::RGB_MAX, "[0, 1]")?;
        check_channel("blue", srgb.blue, domain::RGB_MIN, domain::RGB_MAX, "[0, 1]")?;

        let max = srgb.red.max(srgb.green).max(srgb.blue);
        let k = 1.0 - max;
        if max <= f32::EPSILON {
            return Ok(Cmyk {
                cyan: 0.0,
                magenta: 0.0,
                yellow: 0.0,
                key: 100.0,
            });
        }

        let scale = 100.0 / max;
        Ok(Cmyk {
            cyan: ((max - srgb.red) * scale).clamp(0.0, 100.0),
            magenta: ((max - srgb.green) * scale).clamp(0.0, 100.0),
            yellow: ((max - srgb.blue) * scale).clamp(0.0, 100.0),
            key: (k * 100.0).clamp(0.0, 100.0),
        })
    }

    /// Convert sRGB to hexadecimal color string
    ///
    /// # Returns
    ///
    /// Hex color string (e.g., "#FF0000")
    pub fn srgb_to_hex(&self, srgb: Srgb) -> String {
        self.rgb8_to_hex(srgb_to_rgb8(srgb))
    }

    /// Convert an 8-bit triple to a hexadecimal color string
    pub fn rgb8_to_hex(&self, rgb: [u8; 3]) -> String {
        format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
    }

    /// Parse hexadecimal color string to an 8-bit triple
    ///
    /// Accepts "#FF0000" or "FF0000", case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` if the string is not six hex digits
    pub fn hex_to_rgb8(&self, hex: &str) -> Result<[u8; 3]> {
        let digits = hex.trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(AnalysisError::invalid_parameter("hex", hex));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| AnalysisError::invalid_parameter("hex", hex))
        };
        Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
    }

    /// Parse hexadecimal color string to sRGB
    pub fn hex_to_srgb(&self, hex: &str) -> Result<Srgb> {
        let [r, g, b] = self.hex_to_rgb8(hex)?;
        Ok(Srgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        ))
    }

    /// Compute Delta E (color difference) between two Lab colors
    ///
    /// Uses simple Euclidean distance (ΔE76)
    pub fn delta_e(&self, lab1: Lab, lab2: Lab) -> f32 {
        let dl = lab1.l - lab2.l;
        let da = lab1.a - lab2.a;
        let db = lab1.b - lab2.b;
        (dl * dl + da * da + db * db).sqrt()
    }
}

fn srgb_to_rgb8(srgb: Srgb) -> [u8; 3] {
    [
        (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

fn check_channel(
    channel: &'static str,
    value: f32,
    min: f32,
    max: f32,
    expected: &'static str,
) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(AnalysisError::InvalidColorRange {
            channel,
            value,
            expected,
        });
    }
    Ok(())
}
