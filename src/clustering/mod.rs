//! Saliency-weighted color clustering
//!
//! Every pixel becomes a [`WeightedSample`]: its Lab color paired with its
//! fused saliency. [`WeightedPaletteClusterer`] groups the samples with a
//! weighted k-means so attended colors pull centroids towards themselves.

pub mod kmeans;

pub use kmeans::{Cluster, Clustering, WeightedPaletteClusterer};

use palette::Lab;

use crate::image::LabImage;
use crate::saliency::SaliencyMap;
use crate::{AnalysisError, Result};

/// One pixel's color and its saliency weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSample {
    pub color: Lab,
    pub weight: f32,
}

impl WeightedSample {
    /// Pair every Lab pixel with its saliency score
    ///
    /// Weights are floored at `min_weight` so that unattended regions still
    /// take part in clustering with a negligible pull.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the image and map differ in size.
    pub fn collect(lab: &LabImage, saliency: &SaliencyMap, min_weight: f32) -> Result<Vec<Self>> {
        if lab.width() != saliency.width() || lab.height() != saliency.height() {
            return Err(AnalysisError::invalid_input(format!(
                "saliency map is {}x{} but image is {}x{}",
                saliency.width(),
                saliency.height(),
                lab.width(),
                lab.height()
            )));
        }

        Ok(lab
            .pixels()
            .iter()
            .zip(saliency.values())
            .map(|(&color, &s)| WeightedSample {
                color,
                weight: s.max(min_weight),
            })
            .collect())
    }
}
