//! Palette swatch formatting and statistics
//!
//! Turns a cluster centroid and its members into a [`PaletteSwatch`]:
//! - Display encodings (hex, 8-bit RGB, CMYK) derived from the Lab centroid
//! - Saliency mass, mean saliency and share of the palette's total mass
//! - Pixel coverage and saliency-weighted color variance

use std::cmp::Ordering;

use palette::Lab;
use serde::{Deserialize, Serialize};

use crate::clustering::WeightedSample;
use crate::color::{Cmyk, ColorConverter};
use crate::{AnalysisError, Result};

/// One output color with its encodings and statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteSwatch {
    /// Hexadecimal color representation ("#RRGGBB")
    pub hex: String,
    /// 8-bit sRGB triple
    pub rgb: [u8; 3],
    /// Subtractive encoding in percent
    pub cmyk: Cmyk,
    /// Cluster centroid in CIE Lab (D65)
    pub lab: Lab,
    /// Sum of member saliency weights
    pub saliency_mass: f32,
    /// Average saliency weight of the members
    pub mean_saliency: f32,
    /// Saliency mass divided by the mass of all clustered pixels
    pub saliency_share: f32,
    /// Fraction of image pixels assigned to this swatch
    pub coverage: f32,
    /// Saliency-weighted mean squared ΔE between members and the centroid
    pub variance: f32,
    /// Number of member pixels
    pub pixel_count: usize,
}

impl PaletteSwatch {
    /// Output ordering: descending saliency mass, then descending coverage,
    /// then ascending lightness.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .saliency_mass
            .total_cmp(&self.saliency_mass)
            .then_with(|| other.coverage.total_cmp(&self.coverage))
            .then_with(|| self.lab.l.total_cmp(&other.lab.l))
    }
}

/// Totals over the whole clustered image, shared by every swatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteTotals {
    /// Number of pixels that were clustered
    pub pixel_count: usize,
    /// Sum of all sample weights
    pub saliency_mass: f64,
}

impl PaletteTotals {
    /// Accumulate totals over a sample set
    pub fn from_samples(samples: &[WeightedSample]) -> Self {
        Self {
            pixel_count: samples.len(),
            saliency_mass: samples.iter().map(|s| f64::from(s.weight)).sum(),
        }
    }
}

/// Stateless centroid-to-swatch formatter
#[derive(Debug, Clone, Copy, Default)]
pub struct SwatchFormatter {
    converter: ColorConverter,
}

impl SwatchFormatter {
    /// Create a new swatch formatter
    pub fn new() -> Self {
        Self {
            converter: ColorConverter::new(),
        }
    }

    /// Format one cluster as a swatch
    ///
    /// # Arguments
    ///
    /// * `centroid` - Cluster centroid in Lab
    /// * `members` - Samples assigned to the cluster
    /// * `totals` - Image-wide totals used for coverage and share
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the cluster has no members and
    /// `AnalysisError::InvalidColorRange` if the centroid is not a valid Lab color.
    pub fn format<'a, I>(
        &self,
        centroid: Lab,
        members: I,
        totals: &PaletteTotals,
    ) -> Result<PaletteSwatch>
    where
        I: IntoIterator<Item = &'a WeightedSample>,
    {
        let mut count = 0usize;
        let mut mass = 0.0f64;
        let mut weighted_sq = 0.0f64;
        for sample in members {
            let delta_e = f64::from(self.converter.delta_e(sample.color, centroid));
            count += 1;
            mass += f64::from(sample.weight);
            weighted_sq += f64::from(sample.weight) * delta_e * delta_e;
        }

        if count == 0 {
            return Err(AnalysisError::invalid_input("cannot format an empty cluster"));
        }

        let srgb = self.converter.lab_to_rgb(centroid)?;
        let rgb = self.converter.lab_to_rgb8(centroid)?;
        let cmyk = self.converter.rgb_to_cmyk(srgb)?;

        let variance = if mass > 0.0 { weighted_sq / mass } else { 0.0 };
        let share = if totals.saliency_mass > 0.0 {
            mass / totals.saliency_mass
        } else {
            0.0
        };
        let coverage = if totals.pixel_count > 0 {
            count as f64 / totals.pixel_count as f64
        } else {
            0.0
        };

        Ok(PaletteSwatch {
            hex: self.converter.rgb8_to_hex(rgb),
            rgb,
            cmyk,
            lab: centroid,
            saliency_mass: mass as f32,
            mean_saliency: (mass / count as f64) as f32,
            saliency_share: share as f32,
            coverage: coverage as f32,
            variance: variance as f32,
            pixel_count: count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(l: f32, a: f32, b: f32, weight: f32) -> WeightedSample {
        WeightedSample {
            color: Lab::new(l, a, b),
            weight,
        }
    }

    #[test]
    fn test_format_statistics() {
        let formatter = SwatchFormatter::new();
        let members = vec![sample(50.0, 10.0, 10.0, 0.5), sample(50.0, 10.0, 10.0, 1.0)];
        let totals = PaletteTotals {
            pixel_count: 6,
            saliency_mass: 3.0,
        };

        let swatch = formatter
            .format(Lab::new(50.0, 10.0, 10.0), &members, &totals)
            .unwrap();

        assert_eq!(swatch.pixel_count, 2);
        assert!((swatch.saliency_mass - 1.5).abs() < 1e-6);
        assert!((swatch.mean_saliency - 0.75).abs() < 1e-6);
        assert!((swatch.saliency_share - 0.5).abs() < 1e-6);
        assert!((swatch.coverage - 1.0 / 3.0).abs() < 1e-6);
        assert!(swatch.variance < 1e-6);
    }

    #[test]
    fn test_format_encodings_agree() {
        let formatter = SwatchFormatter::new();
        let converter = ColorConverter::new();
        let centroid = converter.rgb8_to_lab(200, 40, 90);
        let members = vec![WeightedSample {
            color: centroid,
            weight: 1.0,
        }];
        let totals = PaletteTotals::from_samples(&members);

        let swatch = formatter.format(centroid, &members, &totals).unwrap();
        assert_eq!(converter.hex_to_rgb8(&swatch.hex).unwrap(), swatch.rgb);
        for (got, want) in swatch.rgb.iter().zip([200u8, 40, 90]) {
            assert!((i16::from(*got) - i16::from(want)).abs() <= 1);
        }
        assert!(swatch.cmyk.key < 25.0);
    }

    #[test]
    fn test_variance_is_weighted() {
        let formatter = SwatchFormatter::new();
        let centroid = Lab::new(50.0, 0.0, 0.0);
        let members = vec![sample(40.0, 0.0, 0.0, 1.0), sample(60.0, 0.0, 0.0, 1.0)];
        let totals = PaletteTotals::from_samples(&members);

        let swatch = formatter.format(centroid, &members, &totals).unwrap();
        assert!((swatch.variance - 100.0).abs() < 1e-3);

        let skewed = vec![sample(50.0, 0.0, 0.0, 3.0), sample(60.0, 0.0, 0.0, 1.0)];
        let swatch = formatter.format(centroid, &skewed, &totals).unwrap();
        assert!((swatch.variance - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_format_empty_cluster() {
        let formatter = SwatchFormatter::new();
        let totals = PaletteTotals {
            pixel_count: 1,
            saliency_mass: 1.0,
        };
        let members: Vec<WeightedSample> = Vec::new();
        assert!(formatter
            .format(Lab::new(50.0, 0.0, 0.0), &members, &totals)
            .is_err());
    }

    #[test]
    fn test_rank_ordering() {
        let formatter = SwatchFormatter::new();
        let totals = PaletteTotals {
            pixel_count: 10,
            saliency_mass: 10.0,
        };
        let heavy = formatter
            .format(Lab::new(70.0, 0.0, 0.0), &[sample(70.0, 0.0, 0.0, 2.0)], &totals)
            .unwrap();
        let light = formatter
            .format(Lab::new(20.0, 0.0, 0.0), &[sample(20.0, 0.0, 0.0, 1.0)], &totals)
            .unwrap();
        let light_tie = formatter
            .format(Lab::new(80.0, 0.0, 0.0), &[sample(80.0, 0.0, 0.0, 1.0)], &totals)
            .unwrap();

        // Same mass as `light` spread over twice the pixels.
        let wide = formatter
            .format(
                Lab::new(90.0, 0.0, 0.0),
                &[sample(90.0, 0.0, 0.0, 0.5), sample(90.0, 0.0, 0.0, 0.5)],
                &totals,
            )
            .unwrap();
        assert_eq!(wide.saliency_mass, light.saliency_mass);
        assert!(wide.coverage > light.coverage);

        let mut swatches = vec![light_tie.clone(), light.clone(), wide.clone(), heavy.clone()];
        swatches.sort_by(PaletteSwatch::rank_cmp);
        assert_eq!(swatches, vec![heavy, wide, light, light_tie]);
    }
}
