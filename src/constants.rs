//! Reference values and default parameters for palette extraction
//!
//! Colorimetric constants follow the CIE standards. The per-stage modules hold
//! the documented starting values for [`crate::PaletteConfig`]; they are tuning
//! parameters, not physical constants.

/// D65 Standard Illuminant Reference
///
/// CIE Standard Illuminant D65 represents average daylight with a correlated
/// color temperature of 6504K. sRGB and the Lab conversions in this crate use it.
pub mod d65 {
    /// D65 white point in CIE XYZ color space (array form)
    /// Source: CIE 15:2004 Colorimetry, 3rd edition
    pub const WHITE_POINT_XYZ: [f32; 3] = [0.95047, 1.00000, 1.08883];
}

/// Re-export D65 white point at top level for convenience
pub const D65_WHITE_POINT_XYZ: [f32; 3] = d65::WHITE_POINT_XYZ;

/// Valid channel domains for conversions
pub mod domain {
    /// Lightness range of CIELab
    pub const L_MIN: f32 = 0.0;
    pub const L_MAX: f32 = 100.0;

    /// Accepted range for the a* and b* axes
    pub const AB_MIN: f32 = -128.0;
    pub const AB_MAX: f32 = 128.0;

    /// Normalized RGB channel range
    pub const RGB_MIN: f32 = 0.0;
    pub const RGB_MAX: f32 = 1.0;
}

/// Frequency-tuned saliency defaults
pub mod fts {
    /// Gaussian blur radius in pixels (5x5 kernel)
    pub const BLUR_RADIUS: usize = 2;

    /// Largest accepted blur radius
    pub const MAX_BLUR_RADIUS: usize = 64;
}

/// Graph-based saliency defaults
pub mod gbvs {
    /// Block size used to build the coarse feature grid
    pub const DOWNSAMPLE_FACTOR: usize = 8;

    /// Upper bound on graph nodes; the dense transition matrix is nodes^2
    pub const MAX_NODES: usize = 1024;

    /// Hard ceiling on `max_nodes`; 4096 nodes is a 128 MiB matrix
    pub const NODE_LIMIT: usize = 4096;

    /// Spatial falloff as a fraction of the larger grid dimension
    pub const SIGMA_FRACTION: f32 = 0.15;

    /// L1 change below which the stationary distribution is accepted
    pub const CONVERGENCE_TOLERANCE: f64 = 1e-7;

    /// Power iteration budget per stage
    pub const MAX_ITERATIONS: usize = 1000;

    /// Relative weight of the edge-strength feature
    pub const EDGE_WEIGHT: f32 = 1.0;
}

/// Saliency fusion defaults
pub mod fusion {
    /// Share of the frequency-tuned map in weighted-average mode
    pub const WEIGHT: f32 = 0.5;

    /// Radius of the smoothing pass applied to the fused map
    pub const SMOOTHING_RADIUS: usize = 2;

    /// Largest accepted smoothing radius
    pub const MAX_SMOOTHING_RADIUS: usize = 64;
}

/// Weighted k-means defaults
pub mod clustering {
    /// Lloyd iteration budget
    pub const MAX_ITERATIONS: usize = 50;

    /// Maximum centroid shift (ΔE) considered converged
    pub const TOLERANCE: f32 = 0.01;

    /// Floor applied to per-pixel saliency weights
    pub const MIN_SAMPLE_WEIGHT: f32 = 1e-3;

    /// Seed for centroid initialization
    pub const RANDOM_SEED: u64 = 42;

    /// Scale applied to ΔL in the clustering distance
    pub const LIGHTNESS_WEIGHT: f32 = 1.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d65_constants() {
        assert!((d65::WHITE_POINT_XYZ[0] - 0.95047).abs() < 1e-5);
        assert!((d65::WHITE_POINT_XYZ[1] - 1.00000).abs() < 1e-5);
        assert!((d65::WHITE_POINT_XYZ[2] - 1.08883).abs() < 1e-5);
    }

    #[test]
    fn test_default_ranges() {
        assert!(domain::L_MIN < domain::L_MAX);
        assert!(fusion::WEIGHT >= 0.0 && fusion::WEIGHT <= 1.0);
        assert!(gbvs::DOWNSAMPLE_FACTOR >= 1);
        assert!(gbvs::MAX_NODES >= 4 && gbvs::MAX_NODES <= gbvs::NODE_LIMIT);
        assert!(fts::BLUR_RADIUS <= fts::MAX_BLUR_RADIUS);
        assert!(fusion::SMOOTHING_RADIUS <= fusion::MAX_SMOOTHING_RADIUS);
        assert!(clustering::MIN_SAMPLE_WEIGHT > 0.0);
    }
}
