//! Configuration structures for palette extraction.
//!
//! Every tunable number in the pipeline lives here, grouped by the stage that
//! consumes it. Defaults come from [`crate::constants`].
//!
//! # Configuration Loading
//!
//! ```no_run
//! use salient_palette::PaletteConfig;
//! use std::path::Path;
//!
//! // Load from file; missing fields fall back to their defaults
//! let config = PaletteConfig::from_json_file(Path::new("palette.json"))?;
//!
//! // Or use defaults
//! let config = PaletteConfig::default();
//! # Ok::<(), salient_palette::AnalysisError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`FtsConfig`]: frequency-tuned saliency
//! - [`GbvsConfig`]: graph-based saliency
//! - [`FusionConfig`]: how the two maps are combined
//! - [`ClusteringConfig`]: weighted k-means

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants;
use crate::saliency::FusionMode;
use crate::{AnalysisError, Result};

/// Complete configuration for [`crate::extract_palette`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Saliency estimation and fusion
    pub saliency: SaliencyConfig,

    /// Weighted k-means
    pub clustering: ClusteringConfig,

    /// Run the two estimators concurrently and parallelize k-means assignment
    pub parallel: bool,
}

/// Saliency section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaliencyConfig {
    pub fts: FtsConfig,
    pub gbvs: GbvsConfig,
    pub fusion: FusionConfig,
}

/// Frequency-tuned saliency parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtsConfig {
    /// Gaussian blur radius in pixels, 0 disables the blur
    pub blur_radius: usize,

    /// Divide by this percentile (0-100) of the distances instead of the
    /// maximum, clipping to 1
    pub normalization_percentile: Option<f32>,
}

/// Graph-based saliency parameters.
///
/// The dense transition matrix holds `nodes^2` entries, so `max_nodes` bounds
/// both memory and the cost of each power-iteration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbvsConfig {
    /// Block size of the coarse feature grid; raised automatically until the
    /// grid fits in `max_nodes`
    pub downsample_factor: usize,

    /// Upper bound on graph nodes
    pub max_nodes: usize,

    /// Spatial Gaussian sigma as a fraction of the larger grid dimension
    pub sigma_fraction: f32,

    /// Relative weight of the edge-strength feature
    pub edge_weight: f32,

    /// L1 change below which the equilibrium is accepted
    pub convergence_tolerance: f64,

    /// Power iteration budget per stage
    pub max_iterations: usize,

    /// Run the second (activation-weighted) Markov stage
    pub two_stage: bool,
}

/// Fusion method as written in configuration files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    #[default]
    WeightedAverage,
    Maximum,
}

/// Fusion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub method: FusionMethod,

    /// Share of the frequency-tuned map (0.0-1.0), weighted average only
    pub weight: f32,

    /// Gaussian smoothing radius applied to the fused map, 0 disables it
    pub smoothing_radius: usize,
}

/// Weighted k-means parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Lloyd iteration budget
    pub max_iterations: usize,

    /// Largest centroid shift (ΔE) treated as converged
    pub tolerance: f32,

    /// Seed for centroid initialization
    pub random_seed: u64,

    /// Floor on per-pixel weights, must be positive
    pub min_sample_weight: f32,

    /// Scale on ΔL in the clustering distance
    pub lightness_weight: f32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            saliency: SaliencyConfig::default(),
            clustering: ClusteringConfig::default(),
            parallel: true,
        }
    }
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            blur_radius: constants::fts::BLUR_RADIUS,
            normalization_percentile: None,
        }
    }
}

impl Default for GbvsConfig {
    fn default() -> Self {
        Self {
            downsample_factor: constants::gbvs::DOWNSAMPLE_FACTOR,
            max_nodes: constants::gbvs::MAX_NODES,
            sigma_fraction: constants::gbvs::SIGMA_FRACTION,
            edge_weight: constants::gbvs::EDGE_WEIGHT,
            convergence_tolerance: constants::gbvs::CONVERGENCE_TOLERANCE,
            max_iterations: constants::gbvs::MAX_ITERATIONS,
            two_stage: true,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            method: FusionMethod::WeightedAverage,
            weight: constants::fusion::WEIGHT,
            smoothing_radius: constants::fusion::SMOOTHING_RADIUS,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_iterations: constants::clustering::MAX_ITERATIONS,
            tolerance: constants::clustering::TOLERANCE,
            random_seed: constants::clustering::RANDOM_SEED,
            min_sample_weight: constants::clustering::MIN_SAMPLE_WEIGHT,
            lightness_weight: constants::clustering::LIGHTNESS_WEIGHT,
        }
    }
}

impl FusionConfig {
    /// Fusion mode handed to [`crate::saliency::fuse`]
    pub fn mode(&self) -> FusionMode {
        match self.method {
            FusionMethod::WeightedAverage => FusionMode::WeightedAverage {
                weight: self.weight,
            },
            FusionMethod::Maximum => FusionMode::Maximum,
        }
    }
}

fn check(valid: bool, parameter: &str, value: impl ToString) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(AnalysisError::invalid_parameter(parameter, value))
    }
}

impl PaletteConfig {
    /// Check every parameter against its valid range
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let fts = &self.saliency.fts;
        check(
            fts.blur_radius <= constants::fts::MAX_BLUR_RADIUS,
            "saliency.fts.blur_radius",
            fts.blur_radius,
        )?;
        if let Some(p) = fts.normalization_percentile {
            check(
                p.is_finite() && p > 0.0 && p <= 100.0,
                "saliency.fts.normalization_percentile",
                p,
            )?;
        }

        let gbvs = &self.saliency.gbvs;
        check(
            gbvs.downsample_factor >= 1,
            "saliency.gbvs.downsample_factor",
            gbvs.downsample_factor,
        )?;
        check(
            (4..=constants::gbvs::NODE_LIMIT).contains(&gbvs.max_nodes),
            "saliency.gbvs.max_nodes",
            gbvs.max_nodes,
        )?;
        check(
            gbvs.sigma_fraction.is_finite() && gbvs.sigma_fraction > 0.0,
            "saliency.gbvs.sigma_fraction",
            gbvs.sigma_fraction,
        )?;
        check(
            gbvs.edge_weight.is_finite() && gbvs.edge_weight >= 0.0,
            "saliency.gbvs.edge_weight",
            gbvs.edge_weight,
        )?;
        check(
            gbvs.convergence_tolerance.is_finite() && gbvs.convergence_tolerance > 0.0,
            "saliency.gbvs.convergence_tolerance",
            gbvs.convergence_tolerance,
        )?;
        check(gbvs.max_iterations >= 1, "saliency.gbvs.max_iterations", gbvs.max_iterations)?;

        let fusion = &self.saliency.fusion;
        check(
            (0.0..=1.0).contains(&fusion.weight),
            "saliency.fusion.weight",
            fusion.weight,
        )?;
        check(
            fusion.smoothing_radius <= constants::fusion::MAX_SMOOTHING_RADIUS,
            "saliency.fusion.smoothing_radius",
            fusion.smoothing_radius,
        )?;

        let clustering = &self.clustering;
        check(
            clustering.max_iterations >= 1,
            "clustering.max_iterations",
            clustering.max_iterations,
        )?;
        check(
            clustering.tolerance.is_finite() && clustering.tolerance >= 0.0,
            "clustering.tolerance",
            clustering.tolerance,
        )?;
        check(
            clustering.min_sample_weight.is_finite() && clustering.min_sample_weight > 0.0,
            "clustering.min_sample_weight",
            clustering.min_sample_weight,
        )?;
        check(
            clustering.lightness_weight.is_finite() && clustering.lightness_weight > 0.0,
            "clustering.lightness_weight",
            clustering.lightness_weight,
        )?;

        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::config(format!("cannot read {}", path.display()), e)
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            AnalysisError::config(format!("cannot parse {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::config("cannot serialize configuration", e))?;
        std::fs::write(path, json).map_err(|e| {
            AnalysisError::config(format!("cannot write {}", path.display()), e)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PaletteConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.parallel);
        assert_eq!(config.saliency.fusion.mode(), FusionMode::WeightedAverage { weight: 0.5 });
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "saliency": { "fusion": { "method": "maximum" } }, "parallel": false }"#;
        let config: PaletteConfig = serde_json::from_str(json).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.saliency.fusion.mode(), FusionMode::Maximum);
        assert_eq!(config.saliency.gbvs, GbvsConfig::default());
        assert_eq!(config.clustering.random_seed, constants::clustering::RANDOM_SEED);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut config = PaletteConfig::default();
        config.saliency.fusion.weight = 1.5;
        match config.validate() {
            Err(AnalysisError::InvalidParameter { parameter, .. }) => {
                assert_eq!(parameter, "saliency.fusion.weight");
            }
            other => panic!("expected InvalidParameter, got {:?}", other),
        }

        let mut config = PaletteConfig::default();
        config.clustering.min_sample_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = PaletteConfig::default();
        config.saliency.fts.normalization_percentile = Some(120.0);
        assert!(config.validate().is_err());

        let mut config = PaletteConfig::default();
        config.saliency.gbvs.downsample_factor = 0;
        assert!(config.validate().is_err());
    }

    fn rejected_parameter(config: &PaletteConfig) -> String {
        match config.validate() {
            Err(AnalysisError::InvalidParameter { parameter, .. }) => parameter,
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_parameters_rejected() {
        let mut config = PaletteConfig::default();
        config.saliency.fts.blur_radius = usize::MAX;
        assert_eq!(rejected_parameter(&config), "saliency.fts.blur_radius");

        let mut config = PaletteConfig::default();
        config.saliency.fusion.smoothing_radius = constants::fusion::MAX_SMOOTHING_RADIUS + 1;
        assert_eq!(rejected_parameter(&config), "saliency.fusion.smoothing_radius");

        let mut config = PaletteConfig::default();
        config.saliency.gbvs.max_nodes = usize::MAX;
        assert_eq!(rejected_parameter(&config), "saliency.gbvs.max_nodes");

        let mut config = PaletteConfig::default();
        config.saliency.fts.blur_radius = constants::fts::MAX_BLUR_RADIUS;
        config.saliency.gbvs.max_nodes = constants::gbvs::NODE_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_radius_in_json_file_rejected() {
        let path = std::env::temp_dir()
            .join(format!("salient_palette_radius_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "saliency": { "fusion": { "smoothing_radius": 100000 } } }"#)
            .unwrap();
        let result = PaletteConfig::from_json_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(AnalysisError::InvalidParameter { .. })));
    }

    #[test]
    fn test_json_file_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("salient_palette_config_{}.json", std::process::id()));
        let mut config = PaletteConfig::default();
        config.clustering.random_seed = 7;
        config.saliency.fts.normalization_percentile = Some(95.0);

        config.to_json_file(&path).unwrap();
        let loaded = PaletteConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err =
            PaletteConfig::from_json_file(Path::new("/nonexistent/palette.json")).unwrap_err();
        assert!(matches!(err, AnalysisError::ConfigError { .. }));
    }
}
