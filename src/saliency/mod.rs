//! Saliency estimation module
//!
//! Two independent estimators produce a common [`SaliencyMap`]:
//! - [`FrequencyTunedSaliency`]: distance of each blurred Lab pixel from the mean color
//! - [`GraphBasedSaliency`]: Markov-chain equilibrium over a coarse feature graph
//!
//! [`fusion`] combines any two maps without knowing which estimator made them.

pub mod filter;
pub mod frequency_tuned;
pub mod fusion;
pub mod graph_based;
pub mod markov;

pub use frequency_tuned::FrequencyTunedSaliency;
pub use fusion::{fuse, FusionMode};
pub use graph_based::GraphBasedSaliency;

use serde::{Deserialize, Serialize};

use crate::image::{Image, LabImage};
use crate::{AnalysisError, Result};

/// Relative spread below which a map is treated as constant
const FLAT_MAP_EPSILON: f32 = 1e-5;

/// A saliency estimator over one image
///
/// Implementations must be pure: the same inputs always yield the same map.
pub trait SaliencyEstimator: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Estimate a saliency map with the image's dimensions
    fn estimate(&self, image: &Image, lab: &LabImage) -> Result<SaliencyMap>;
}

/// Per-pixel saliency scores, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
    approximate: bool,
}

impl SaliencyMap {
    /// Build a map from raw scores
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` on zero dimensions or a length
    /// mismatch, and `AnalysisError::ProcessingError` if a score is not finite.
    pub fn new(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || values.len() != width * height {
            return Err(AnalysisError::invalid_input(format!(
                "saliency map of {} values does not fit {}x{}",
                values.len(),
                width,
                height
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(AnalysisError::ProcessingError {
                message: format!("saliency score {} is not finite", bad),
            });
        }
        Ok(Self {
            width,
            height,
            values,
            approximate: false,
        })
    }

    /// All-zero map
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
            approximate: false,
        }
    }

    /// Mark the map as produced from a non-converged iterate
    pub fn with_approximate(mut self, approximate: bool) -> Self {
        self.approximate = approximate;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Score at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// True when an iterative solve behind this map did not converge
    pub fn is_approximate(&self) -> bool {
        self.approximate
    }

    pub fn same_dimensions(&self, other: &SaliencyMap) -> bool {
        self.width == other.width && self.height == other.height
    }

    fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::MIN, f32::max)
    }

    fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::MAX, f32::min)
    }

    fn map_values(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            width: self.width,
            height: self.height,
            values: self.values.iter().map(|&v| f(v).clamp(0.0, 1.0)).collect(),
            approximate: self.approximate,
        }
    }

    /// Rescale so the minimum maps to 0 and the maximum to 1
    ///
    /// A constant map carries no saliency information and becomes all zeros.
    pub fn normalized(&self) -> Self {
        let (min, max) = (self.min(), self.max());
        let range = max - min;
        if range <= FLAT_MAP_EPSILON * max.abs().max(1.0) {
            return Self::zeros(self.width, self.height).with_approximate(self.approximate);
        }
        self.map_values(|v| (v - min) / range)
    }

    /// Divide by the maximum, clipping into `[0, 1]`
    pub fn normalized_by_max(&self) -> Self {
        let max = self.max();
        if max <= f32::EPSILON {
            return Self::zeros(self.width, self.height).with_approximate(self.approximate);
        }
        self.map_values(|v| v / max)
    }

    /// Divide by the given percentile, clipping into `[0, 1]`
    ///
    /// Pixels above the percentile saturate at 1, which keeps a handful of
    /// extreme pixels from compressing the rest of the map. Falls back to
    /// [`Self::normalized_by_max`] when the percentile value is zero.
    pub fn normalized_by_percentile(&self, percentile: f32) -> Self {
        let reference = percentile_of(&self.values, percentile);
        if reference <= f32::EPSILON {
            return self.normalized_by_max();
        }
        self.map_values(|v| v / reference)
    }

    /// Descriptive statistics of the scores
    pub fn stats(&self) -> SaliencyStats {
        let n = self.values.len() as f64;
        let mean = self.values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let var = self
            .values
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        SaliencyStats {
            min: self.min(),
            max: self.max(),
            mean: mean as f32,
            std: var.sqrt() as f32,
            percentile_10: percentile_of(&self.values, 10.0),
            percentile_90: percentile_of(&self.values, 90.0),
        }
    }
}

/// Summary of a saliency map's distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaliencyStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub std: f32,
    pub percentile_10: f32,
    pub percentile_90: f32,
}

/// Nearest-rank percentile (0-100) of a non-empty slice
fn percentile_of(values: &[f32], percentile: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    sorted[rank.round() as usize]
}
