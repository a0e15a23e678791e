//! Weighted k-means in Lab space
//!
//! - Seeding: first centroid drawn with probability proportional to weight,
//!   each further one proportional to `weight * D^2` (distance to the nearest
//!   chosen centroid). Seeding stops early once every sample coincides with a
//!   centroid, which is how images with fewer than K colors yield fewer clusters.
//! - Lloyd iterations: nearest-centroid assignment (ties go to the lower
//!   index), then weighted-mean update.
//! - Empty and duplicate clusters are dropped from the result.
//!
//! Assignment may run in parallel; sums are accumulated sequentially in `f64`
//! so a given seed always produces bit-identical centroids.

use palette::Lab;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::clustering::WeightedSample;
use crate::config::ClusteringConfig;
use crate::image::LabImage;
use crate::saliency::SaliencyMap;
use crate::{AnalysisError, Result};

/// Squared distance at or below which two colors are the same color
const DUPLICATE_EPSILON: f64 = 1e-10;

/// One output cluster
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Saliency-weighted mean of the members
    pub centroid: Lab,
    /// Indices into the sample slice
    pub members: Vec<usize>,
    /// Sum of member weights
    pub mass: f64,
}

/// Result of a clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Non-empty clusters ordered by descending mass, then descending member
    /// count, then ascending lightness
    pub clusters: Vec<Cluster>,
    /// Lloyd iterations performed
    pub iterations: usize,
    /// Whether the centroid shift dropped below the tolerance
    pub converged: bool,
}

/// Saliency-weighted k-means clusterer
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPaletteClusterer {
    max_iterations: usize,
    tolerance: f32,
    seed: u64,
    lightness_weight: f32,
    min_sample_weight: f32,
    parallel: bool,
}

impl Default for WeightedPaletteClusterer {
    fn default() -> Self {
        Self::from_config(&ClusteringConfig::default(), true)
    }
}

impl WeightedPaletteClusterer {
    pub fn from_config(config: &ClusteringConfig, parallel: bool) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            seed: config.random_seed,
            lightness_weight: config.lightness_weight,
            min_sample_weight: config.min_sample_weight,
            parallel,
        }
    }

    /// Use a different seed for centroid initialization
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn distance_sq(&self, a: Lab, b: Lab) -> f64 {
        let dl = f64::from(self.lightness_weight * (a.l - b.l));
        let da = f64::from(a.a - b.a);
        let db = f64::from(a.b - b.b);
        dl * dl + da * da + db * db
    }

    fn nearest(&self, color: Lab, centroids: &[Lab]) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, &c) in centroids.iter().enumerate() {
            let d = self.distance_sq(color, c);
            if d < best_distance {
                best = i;
                best_distance = d;
            }
        }
        best
    }

    /// Draw up to `k` initial centroids
    fn seed_centroids(&self, samples: &[WeightedSample], k: usize) -> Vec<Lab> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = Vec::with_capacity(k);

        let weights: Vec<f64> = samples.iter().map(|s| f64::from(s.weight)).collect();
        let Some(first) = weighted_pick(&mut rng, &weights) else {
            return centroids;
        };
        centroids.push(samples[first].color);

        let mut nearest: Vec<f64> = samples
            .iter()
            .map(|s| self.distance_sq(s.color, samples[first].color))
            .collect();

        while centroids.len() < k {
            let scores: Vec<f64> = weights
                .iter()
                .zip(&nearest)
                .map(|(&w, &d)| if d <= DUPLICATE_EPSILON { 0.0 } else { w * d })
                .collect();
            let Some(next) = weighted_pick(&mut rng, &scores) else {
                debug!(
                    requested = k,
                    distinct = centroids.len(),
                    "fewer distinct colors than requested clusters"
                );
                break;
            };
            let chosen = samples[next].color;
            centroids.push(chosen);
            for (d, s) in nearest.iter_mut().zip(samples) {
                *d = d.min(self.distance_sq(s.color, chosen));
            }
        }

        centroids
    }

    fn assign(&self, samples: &[WeightedSample], centroids: &[Lab], assignments: &mut [usize]) {
        if self.parallel {
            assignments
                .par_iter_mut()
                .zip(samples.par_iter())
                .for_each(|(a, s)| *a = self.nearest(s.color, centroids));
        } else {
            for (a, s) in assignments.iter_mut().zip(samples) {
                *a = self.nearest(s.color, centroids);
            }
        }
    }

    /// Weighted means per cluster; clusters left empty keep their centroid
    fn update(
        &self,
        samples: &[WeightedSample],
        assignments: &[usize],
        centroids: &[Lab],
    ) -> Vec<Lab> {
        let mut sums = vec![[0.0f64; 4]; centroids.len()];
        for (s, &a) in samples.iter().zip(assignments) {
            let w = f64::from(s.weight);
            let acc = &mut sums[a];
            acc[0] += w * f64::from(s.color.l);
            acc[1] += w * f64::from(s.color.a);
            acc[2] += w * f64::from(s.color.b);
            acc[3] += w;
        }

        sums.iter()
            .zip(centroids)
            .map(|(acc, &old)| {
                if acc[3] > 0.0 {
                    Lab::new(
                        (acc[0] / acc[3]) as f32,
                        (acc[1] / acc[3]) as f32,
                        (acc[2] / acc[3]) as f32,
                    )
                } else {
                    old
                }
            })
            .collect()
    }

    /// Cluster the pixels of a Lab image weighted by a saliency map
    ///
    /// Returns the samples alongside the clustering; cluster members index
    /// into them.
    pub fn cluster(
        &self,
        lab: &LabImage,
        saliency: &SaliencyMap,
        k: usize,
    ) -> Result<(Vec<WeightedSample>, Clustering)> {
        let samples = WeightedSample::collect(lab, saliency, self.min_sample_weight)?;
        let clustering = self.cluster_samples(&samples, k)?;
        Ok((samples, clustering))
    }

    /// Cluster weighted samples into at most `k` groups
    ///
    /// Non-convergence within the iteration budget is logged and the last
    /// iterate returned.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `k` is zero, exceeds the number
    /// of samples, or there are no samples.
    pub fn cluster_samples(&self, samples: &[WeightedSample], k: usize) -> Result<Clustering> {
        if samples.is_empty() {
            return Err(AnalysisError::invalid_input("no samples to cluster"));
        }
        if k == 0 || k > samples.len() {
            return Err(AnalysisError::invalid_input(format!(
                "cannot form {} clusters from {} samples",
                k,
                samples.len()
            )));
        }

        let mut centroids = self.seed_centroids(samples, k);
        if centroids.is_empty() {
            return Err(AnalysisError::invalid_input("all sample weights are zero"));
        }

        let mut assignments = vec![0usize; samples.len()];
        let mut iterations = 0;
        let mut converged = false;
        for iteration in 1..=self.max_iterations {
            iterations = iteration;
            self.assign(samples, &centroids, &mut assignments);
            let updated = self.update(samples, &assignments, &centroids);
            let shift = centroids
                .iter()
                .zip(&updated)
                .map(|(&a, &b)| {
                    let (dl, da, db) = (a.l - b.l, a.a - b.a, a.b - b.b);
                    (dl * dl + da * da + db * db).sqrt()
                })
                .fold(0.0f32, f32::max);
            centroids = updated;
            if shift < self.tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(iterations, clusters = centroids.len(), "k-means converged");
        } else {
            warn!(
                iterations,
                clusters = centroids.len(),
                "k-means did not converge, using last iterate"
            );
        }

        self.assign(samples, &centroids, &mut assignments);
        let clusters = self.collect_clusters(samples, &assignments, centroids.len());

        Ok(Clustering {
            clusters,
            iterations,
            converged,
        })
    }

    fn collect_clusters(
        &self,
        samples: &[WeightedSample],
        assignments: &[usize],
        k: usize,
    ) -> Vec<Cluster> {
        let mut members = vec![Vec::new(); k];
        for (i, &a) in assignments.iter().enumerate() {
            members[a].push(i);
        }

        let mut clusters: Vec<Cluster> = members
            .into_iter()
            .filter(|m| !m.is_empty())
            .map(|members| {
                let mut acc = [0.0f64; 4];
                for &i in &members {
                    let s = &samples[i];
                    let w = f64::from(s.weight);
                    acc[0] += w * f64::from(s.color.l);
                    acc[1] += w * f64::from(s.color.a);
                    acc[2] += w * f64::from(s.color.b);
                    acc[3] += w;
                }
                let centroid = if acc[3] > 0.0 {
                    Lab::new(
                        (acc[0] / acc[3]) as f32,
                        (acc[1] / acc[3]) as f32,
                        (acc[2] / acc[3]) as f32,
                    )
                } else {
                    samples[members[0]].color
                };
                Cluster {
                    centroid,
                    members,
                    mass: acc[3],
                }
            })
            .collect();

        clusters.sort_by(|a, b| {
            b.mass
                .total_cmp(&a.mass)
                .then_with(|| b.members.len().cmp(&a.members.len()))
                .then_with(|| a.centroid.l.total_cmp(&b.centroid.l))
        });
        clusters
    }
}

/// Index drawn with probability proportional to its weight, `None` if all
/// weights are zero
fn weighted_pick(rng: &mut StdRng, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if cumulative > target {
            return Some(i);
        }
    }
    last_positive
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

    fn two_blobs() -> Vec<WeightedSample> {
        let mut samples = Vec::new();
        for i in 0..50 {
            let jitter = (i % 5) as f32 * 0.2;
            samples.push(sample(30.0 + jitter, 20.0, -10.0, 0.1));
            samples.push(sample(80.0 - jitter, -5.0, 40.0, 0.9));
        }
        samples
    }

    #[test]
    fn test_equidistant_sample_goes_to_lower_index() {
        let clusterer = WeightedPaletteClusterer::default();
        let midpoint = Lab::new(50.0, 0.0, 0.0);
        let low = Lab::new(40.0, 0.0, 0.0);
        let high = Lab::new(60.0, 0.0, 0.0);

        assert_eq!(clusterer.nearest(midpoint, &[low, high]), 0);
        assert_eq!(clusterer.nearest(midpoint, &[high, low]), 0);
        // Duplicate centroids resolve to the first occurrence.
        assert_eq!(clusterer.nearest(low, &[high, low, low]), 1);
    }

    #[test]
    fn test_weighted_pick_skips_zero_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let idx = weighted_pick(&mut rng, &[0.0, 1.0, 0.0, 3.0]).unwrap();
            assert!(idx == 1 || idx == 3);
        }
        assert_eq!(weighted_pick(&mut rng, &[0.0, 0.0]), None);
    }

    #[test]
    fn test_two_blobs_found() {
        let clusterer = WeightedPaletteClusterer::default();
        let result = clusterer.cluster_samples(&two_blobs(), 2).unwrap();
        assert_eq!(result.clusters.len(), 2);
        assert!(result.converged);

        // Heavier blob first despite equal pixel counts.
        let first = &result.clusters[0];
        assert!((first.centroid.l - 79.6).abs() < 0.5);
        assert_eq!(first.members.len(), 50);
        assert!(first.mass > result.clusters[1].mass);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let samples = two_blobs();
        let clusterer = WeightedPaletteClusterer::default().with_seed(123);
        let a = clusterer.cluster_samples(&samples, 3).unwrap();
        let b = clusterer.cluster_samples(&samples, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let samples = two_blobs();
        let config = ClusteringConfig::default();
        let parallel = WeightedPaletteClusterer::from_config(&config, true);
        let sequential = WeightedPaletteClusterer::from_config(&config, false);
        assert_eq!(
            parallel.cluster_samples(&samples, 4).unwrap(),
            sequential.cluster_samples(&samples, 4).unwrap()
        );
    }

    #[test]
    fn test_single_color_yields_one_cluster() {
        let samples = vec![sample(50.0, 10.0, 10.0, 0.5); 20];
        let result = WeightedPaletteClusterer::default().cluster_samples(&samples, 5).unwrap();
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].members.len(), 20);
    }

    #[test]
    fn test_weight_pulls_centroid() {
        let samples = vec![sample(40.0, 0.0, 0.0, 0.1), sample(60.0, 0.0, 0.0, 0.9)];
        let clusterer = WeightedPaletteClusterer::default();
        let result = clusterer.cluster_samples(&samples, 1).unwrap();
        assert!((result.clusters[0].centroid.l - 58.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_k() {
        let samples = vec![sample(50.0, 0.0, 0.0, 1.0); 3];
        let clusterer = WeightedPaletteClusterer::default();
        assert!(clusterer.cluster_samples(&samples, 0).is_err());
        assert!(clusterer.cluster_samples(&samples, 4).is_err());
        assert!(clusterer.cluster_samples(&[], 1).is_err());
    }

    #[test]
    fn test_iteration_budget_not_fatal() {
        let config = ClusteringConfig {
            max_iterations: 1,
            tolerance: 0.0,
            ..ClusteringConfig::default()
        };
        let clusterer = WeightedPaletteClusterer::from_config(&config, false);
        let result = clusterer.cluster_samples(&two_blobs(), 2).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!(!result.clusters.is_empty());
    }

    #[test]
    fn test_cluster_image_with_saliency() {
        let lab = LabImage::new(
            2,
            2,
            vec![
                Lab::new(20.0, 0.0, 0.0),
                Lab::new(20.0, 0.0, 0.0),
                Lab::new(20.0, 0.0, 0.0),
                Lab::new(70.0, 40.0, 0.0),
            ],
        )
        .unwrap();
        let saliency = SaliencyMap::new(2, 2, vec![0.0, 0.0, 0.0, 1.0]).unwrap();
        let (samples, result) = WeightedPaletteClusterer::default()
            .cluster(&lab, &saliency, 2)
            .unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(result.clusters.len(), 2);
        // The single salient pixel outweighs three floored ones.
        assert_eq!(result.clusters[0].members, vec![3]);
        assert_eq!(result.clusters[1].members.len(), 3);
    }

    #[test]
    fn test_lightness_weight_changes_distance() {
        let config = ClusteringConfig {
            lightness_weight: 0.5,
            ..ClusteringConfig::default()
        };
        let clusterer = WeightedPaletteClusterer::from_config(&config, false);
        let d = clusterer.distance_sq(Lab::new(60.0, 0.0, 0.0), Lab::new(40.0, 0.0, 0.0));
        assert!((d - 100.0).abs() < 1e-9);
    }
}
