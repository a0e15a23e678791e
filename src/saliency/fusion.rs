//! Saliency map fusion
//!
//! Both inputs are min-max normalized before they are combined so that
//! neither estimator's scale dominates, and the result is normalized again.

use crate::saliency::filter::gaussian_blur_scalar;
use crate::saliency::SaliencyMap;
use crate::{AnalysisError, Result};

/// How two saliency maps are combined
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FusionMode {
    /// `w * first + (1 - w) * second`
    WeightedAverage { weight: f32 },
    /// Element-wise maximum
    Maximum,
}

impl Default for FusionMode {
    fn default() -> Self {
        FusionMode::WeightedAverage { weight: 0.5 }
    }
}

/// Fuse two saliency maps of equal size
///
/// The weight of [`FusionMode::WeightedAverage`] applies to `first`
/// (the frequency-tuned map in the pipeline). The result is approximate if
/// either input is.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the maps differ in size and
/// `AnalysisError::InvalidParameter` if the weight is outside `[0, 1]`.
pub fn fuse(first: &SaliencyMap, second: &SaliencyMap, mode: FusionMode) -> Result<SaliencyMap> {
    if !first.same_dimensions(second) {
        return Err(AnalysisError::invalid_input(format!(
            "cannot fuse a {}x{} map with a {}x{} map",
            first.width(),
            first.height(),
            second.width(),
            second.height()
        )));
    }

    let a = first.normalized();
    let b = second.normalized();

    let values: Vec<f32> = match mode {
        FusionMode::WeightedAverage { weight } => {
            if !(0.0..=1.0).contains(&weight) {
                return Err(AnalysisError::invalid_parameter("fusion.weight", weight));
            }
            a.values()
                .iter()
                .zip(b.values())
                .map(|(x, y)| weight * x + (1.0 - weight) * y)
                .collect()
        }
        FusionMode::Maximum => a
            .values()
            .iter()
            .zip(b.values())
            .map(|(x, y)| x.max(*y))
            .collect(),
    };

    Ok(SaliencyMap::new(first.width(), first.height(), values)?
        .with_approximate(first.is_approximate() || second.is_approximate())
        .normalized())
}

/// Gaussian-smooth a map and normalize it again
///
/// Softens block artifacts left by the coarse graph estimator.
pub fn smooth(map: &SaliencyMap, radius: usize) -> Result<SaliencyMap> {
    if radius == 0 {
        return Ok(map.clone());
    }
    let values = gaussian_blur_scalar(map.width(), map.height(), map.values(), radius);
    Ok(SaliencyMap::new(map.width(), map.height(), values)?
        .with_approximate(map.is_approximate())
        .normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(width: usize, values: Vec<f32>) -> SaliencyMap {
        let height = values.len() / width;
        SaliencyMap::new(width, height, values).unwrap()
    }

    fn assert_close(a: &SaliencyMap, b: &SaliencyMap) {
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!((x - y).abs() < 1e-5, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_fuse_with_itself_is_normalization() {
        let m = map(3, vec![0.2, 0.4, 0.9, 0.1, 0.5, 0.3]);
        let fused = fuse(&m, &m, FusionMode::default()).unwrap();
        assert_close(&fused, &m.normalized());

        let fused = fuse(&m, &m, FusionMode::Maximum).unwrap();
        assert_close(&fused, &m.normalized());
    }

    #[test]
    fn test_scale_does_not_dominate() {
        let small = map(2, vec![0.0, 0.001, 0.0, 0.001]);
        let large = map(2, vec![100.0, 0.0, 100.0, 0.0]);
        let fused = fuse(&small, &large, FusionMode::default()).unwrap();
        // After normalization both inputs weigh the same, so every pixel averages
        // to 0.5 and the flat result normalizes to zero.
        assert!(fused.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_weighted_average() {
        let first = map(3, vec![0.0, 1.0, 0.5]);
        let second = map(3, vec![1.0, 0.0, 0.5]);
        let fused = fuse(&first, &second, FusionMode::WeightedAverage { weight: 0.75 }).unwrap();
        assert_close(&fused, &map(3, vec![0.0, 1.0, 0.5]));
    }

    #[test]
    fn test_maximum() {
        let first = map(4, vec![0.0, 1.0, 0.2, 0.0]);
        let second = map(4, vec![0.0, 0.0, 0.8, 1.0]);
        let fused = fuse(&first, &second, FusionMode::Maximum).unwrap();
        assert_close(&fused, &map(4, vec![0.0, 1.0, 0.8, 1.0]));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = map(2, vec![0.0; 4]);
        let b = map(4, vec![0.0; 4]);
        assert!(matches!(
            fuse(&a, &b, FusionMode::Maximum),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_weight_out_of_range() {
        let a = map(2, vec![0.0, 1.0]);
        assert!(fuse(&a, &a, FusionMode::WeightedAverage { weight: 1.5 }).is_err());
    }

    #[test]
    fn test_approximate_propagates() {
        let a = map(2, vec![0.0, 1.0]).with_approximate(true);
        let b = map(2, vec![1.0, 0.0]);
        assert!(fuse(&a, &b, FusionMode::Maximum).unwrap().is_approximate());
    }

    #[test]
    fn test_smooth_keeps_unit_range() {
        let mut values = vec![0.0; 49];
        values[24] = 1.0;
        let smoothed = smooth(&map(7, values), 2).unwrap();
        assert!(smoothed.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(smoothed.get(3, 3), 1.0);
        assert!(smoothed.get(2, 3) > 0.0);
    }
}
