//! End-to-end palette extraction
//!
//! RGB image → Lab → {frequency-tuned, graph-based} saliency → fusion →
//! smoothing → weighted k-means → formatted swatches, ordered by saliency mass.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::clustering::WeightedPaletteClusterer;
use crate::color::{ColorConverter, PaletteSwatch, PaletteTotals, SwatchFormatter};
use crate::config::PaletteConfig;
use crate::image::{Image, LabImage};
use crate::saliency::fusion::smooth;
use crate::saliency::{
    fuse, FrequencyTunedSaliency, GraphBasedSaliency, SaliencyEstimator, SaliencyMap,
    SaliencyStats,
};
use crate::{AnalysisError, Result};

/// Extracted palette plus the context needed to reproduce it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Swatches by descending saliency mass, then descending coverage, then
    /// ascending lightness. May hold fewer than the requested number when the
    /// image has fewer distinct colors.
    pub swatches: Vec<PaletteSwatch>,
    pub metadata: PaletteMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteMetadata {
    pub requested_colors: usize,
    pub width: usize,
    pub height: usize,
    pub pixel_count: usize,
    /// Distribution of the fused saliency map
    pub saliency: SaliencyStats,
    pub config: PaletteConfig,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }

    /// Hex codes in palette order
    pub fn hex_codes(&self) -> Vec<&str> {
        self.swatches.iter().map(|s| s.hex.as_str()).collect()
    }
}

/// Compute the fused, smoothed saliency map that weights clustering
pub fn fused_saliency(
    image: &Image,
    lab: &LabImage,
    config: &PaletteConfig,
) -> Result<SaliencyMap> {
    let fts = FrequencyTunedSaliency::from_config(&config.saliency.fts);
    let gbvs = GraphBasedSaliency::from_config(&config.saliency.gbvs);
    let (fts_map, gbvs_map) = run_estimators(&fts, &gbvs, image, lab, config.parallel);

    let fused = fuse(&fts_map?, &gbvs_map?, config.saliency.fusion.mode())?;
    smooth(&fused, config.saliency.fusion.smoothing_radius)
}

fn run_estimators(
    first: &dyn SaliencyEstimator,
    second: &dyn SaliencyEstimator,
    image: &Image,
    lab: &LabImage,
    parallel: bool,
) -> (Result<SaliencyMap>, Result<SaliencyMap>) {
    let run = |estimator: &dyn SaliencyEstimator| {
        let started = Instant::now();
        let map = estimator.estimate(image, lab);
        debug!(
            estimator = estimator.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "saliency estimated"
        );
        map
    };

    if parallel {
        rayon::join(|| run(first), || run(second))
    } else {
        (run(first), run(second))
    }
}

/// Extract a palette of at most `k` colors weighted by visual saliency
///
/// # Arguments
///
/// * `image` - RGB image with channels in `[0, 1]`
/// * `k` - Requested number of swatches
/// * `config` - Tuning parameters, validated before any work
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `k` is zero or exceeds the pixel
/// count, and `AnalysisError::InvalidParameter` for an out-of-range config value.
/// A uniform image or a solver that runs out of iterations is not an error;
/// it is logged and extraction continues.
#[instrument(skip_all, fields(width = image.width(), height = image.height(), k = k))]
pub fn extract_palette(image: &Image, k: usize, config: &PaletteConfig) -> Result<Palette> {
    if image.is_empty() {
        return Err(AnalysisError::invalid_input("image has no pixels"));
    }
    if k == 0 {
        return Err(AnalysisError::invalid_input("palette size must be at least 1"));
    }
    if k > image.len() {
        return Err(AnalysisError::invalid_input(format!(
            "palette size {} exceeds pixel count {}",
            k,
            image.len()
        )));
    }
    config.validate()?;

    let started = Instant::now();
    let lab = ColorConverter::new().to_lab(image)?;

    let saliency = fused_saliency(image, &lab, config)?;
    let stats = saliency.stats();
    debug!(
        mean = stats.mean,
        std = stats.std,
        approximate = saliency.is_approximate(),
        "saliency fused"
    );

    let clusterer = WeightedPaletteClusterer::from_config(&config.clustering, config.parallel);
    let (samples, clustering) = clusterer.cluster(&lab, &saliency, k)?;

    let totals = PaletteTotals::from_samples(&samples);
    let formatter = SwatchFormatter::new();
    let mut swatches = clustering
        .clusters
        .iter()
        .map(|cluster| {
            formatter.format(
                cluster.centroid,
                cluster.members.iter().map(|&i| &samples[i]),
                &totals,
            )
        })
        .collect::<Result<Vec<_>>>()?;
    swatches.sort_by(PaletteSwatch::rank_cmp);

    info!(
        swatches = swatches.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "palette extracted"
    );

    Ok(Palette {
        swatches,
        metadata: PaletteMetadata {
            requested_colors: k,
            width: image.width(),
            height: image.height(),
            pixel_count: image.len(),
            saliency: stats,
            config: config.clone(),
        },
    })
}
