//! Frequency-tuned saliency
//!
//! Saliency of a pixel is the Euclidean Lab distance between its low-pass
//! filtered color and the mean filtered color of the whole image. The blur
//! removes sensor noise and fine texture so that only region-level contrast
//! remains.

use tracing::{debug, warn};

use crate::config::FtsConfig;
use crate::image::{Image, LabImage};
use crate::saliency::filter::gaussian_blur;
use crate::saliency::{SaliencyEstimator, SaliencyMap};
use crate::Result;

/// Largest distance (ΔE) still treated as "no contrast"
const MIN_CONTRAST: f32 = 1e-3;

/// Frequency-tuned saliency estimator
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTunedSaliency {
    blur_radius: usize,
    normalization_percentile: Option<f32>,
}

impl Default for FrequencyTunedSaliency {
    fn default() -> Self {
        Self::from_config(&FtsConfig::default())
    }
}

impl FrequencyTunedSaliency {
    /// Create an estimator that normalizes by the maximum distance
    pub fn new(blur_radius: usize) -> Self {
        Self {
            blur_radius,
            normalization_percentile: None,
        }
    }

    /// Normalize by a percentile of the distance field instead of its maximum
    pub fn with_percentile(mut self, percentile: f32) -> Self {
        self.normalization_percentile = Some(percentile);
        self
    }

    pub fn from_config(config: &FtsConfig) -> Self {
        Self {
            blur_radius: config.blur_radius,
            normalization_percentile: config.normalization_percentile,
        }
    }

    /// Compute the saliency map of a Lab image
    ///
    /// A uniform image has no pixel that differs from the mean; its map is
    /// all zeros.
    pub fn compute(&self, lab: &LabImage) -> SaliencyMap {
        let (width, height) = (lab.width(), lab.height());
        let blurred = gaussian_blur(width, height, &lab.to_arrays(), self.blur_radius);

        let n = blurred.len() as f64;
        let mut sum = [0.0f64; 3];
        for px in &blurred {
            for (s, &c) in sum.iter_mut().zip(px.iter()) {
                *s += f64::from(c);
            }
        }
        let mean = sum.map(|s| (s / n) as f32);

        let distances: Vec<f32> = blurred
            .iter()
            .map(|px| {
                let dl = px[0] - mean[0];
                let da = px[1] - mean[1];
                let db = px[2] - mean[2];
                (dl * dl + da * da + db * db).sqrt()
            })
            .collect();

        let max = distances.iter().copied().fold(0.0f32, f32::max);
        if max < MIN_CONTRAST {
            warn!(width, height, "uniform image, frequency-tuned saliency is all zeros");
            return SaliencyMap::zeros(width, height);
        }
        debug!(
            mean_l = mean[0],
            mean_a = mean[1],
            mean_b = mean[2],
            max_distance = max,
            "frequency-tuned distances computed"
        );

        let raw = SaliencyMap {
            width,
            height,
            values: distances,
            approximate: false,
        };
        match self.normalization_percentile {
            Some(p) => raw.normalized_by_percentile(p),
            None => raw.normalized_by_max(),
        }
    }
}

impl SaliencyEstimator for FrequencyTunedSaliency {
    fn name(&self) -> &'static str {
        "frequency_tuned"
    }

    fn estimate(&self, _image: &Image, lab: &LabImage) -> Result<SaliencyMap> {
        Ok(self.compute(lab))
    }
}
