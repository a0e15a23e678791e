//! Graph-based visual saliency
//!
//! Pipeline:
//! 1. Block-average the image into a coarse grid of feature nodes
//! 2. Per node: intensity, red-green and blue-yellow opponency, and a Sobel
//!    edge-strength proxy computed on the coarse intensity grid
//! 3. Activation graph: `w(i, j) = |f_i - f_j| * exp(-d(i, j)^2 / 2 sigma^2)`
//! 4. Equilibrium of the random walk on that graph (see [`markov`])
//! 5. Optional normalization graph: `w(i, j) = A(j) * exp(-d(i, j)^2 / 2 sigma^2)`,
//!    which pulls mass towards the strongest activations
//! 6. Bilinear upsampling to full resolution, min-max normalized
//!
//! Nodes that differ from many spatially close nodes collect more equilibrium
//! mass than nodes inside large homogeneous regions.
//!
//! [`markov`]: crate::saliency::markov

use tracing::{debug, warn};

use crate::config::GbvsConfig;
use crate::image::{Image, LabImage};
use crate::saliency::markov::{stationary_distribution, Equilibrium, TransitionMatrix};
use crate::saliency::{SaliencyEstimator, SaliencyMap};
use crate::Result;

/// Relative spread under which the activation stage is considered flat
const FLAT_ACTIVATION_EPSILON: f64 = 1e-9;

/// Graph-based saliency estimator
#[derive(Debug, Clone, PartialEq)]
pub struct GraphBasedSaliency {
    downsample_factor: usize,
    max_nodes: usize,
    sigma_fraction: f32,
    edge_weight: f32,
    tolerance: f64,
    max_iterations: usize,
    two_stage: bool,
}

impl Default for GraphBasedSaliency {
    fn default() -> Self {
        Self::from_config(&GbvsConfig::default())
    }
}

/// Aggregated features of one coarse cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct FeatureNode {
    intensity: f32,
    red_green: f32,
    blue_yellow: f32,
    edge: f32,
}

impl FeatureNode {
    fn distance(&self, other: &FeatureNode) -> f32 {
        let di = self.intensity - other.intensity;
        let drg = self.red_green - other.red_green;
        let dby = self.blue_yellow - other.blue_yellow;
        let de = self.edge - other.edge;
        (di * di + drg * drg + dby * dby + de * de).sqrt()
    }
}

/// Coarse node grid; lives only for one estimate call
#[derive(Debug, Clone)]
struct FeatureGrid {
    width: usize,
    height: usize,
    cell: usize,
    nodes: Vec<FeatureNode>,
}

impl FeatureGrid {
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn position(&self, index: usize) -> (f32, f32) {
        ((index % self.width) as f32, (index / self.width) as f32)
    }

    /// Dense weight matrix from a pairwise function, scaled by spatial proximity
    fn weights(&self, sigma: f32, pair: impl Fn(usize, usize) -> f32) -> Vec<f64> {
        let n = self.len();
        let denom = 2.0 * sigma * sigma;
        let mut weights = vec![0.0f64; n * n];
        for (i, row) in weights.chunks_mut(n).enumerate() {
            let (xi, yi) = self.position(i);
            for (j, w) in row.iter_mut().enumerate() {
                let (xj, yj) = self.position(j);
                let d2 = (xi - xj).powi(2) + (yi - yj).powi(2);
                *w = f64::from(pair(i, j) * (-d2 / denom).exp());
            }
        }
        weights
    }
}

impl GraphBasedSaliency {
    pub fn from_config(config: &GbvsConfig) -> Self {
        Self {
            downsample_factor: config.downsample_factor,
            max_nodes: config.max_nodes,
            sigma_fraction: config.sigma_fraction,
            edge_weight: config.edge_weight,
            tolerance: config.convergence_tolerance,
            max_iterations: config.max_iterations,
            two_stage: config.two_stage,
        }
    }

    /// Smallest block size not below the configured factor whose grid fits
    /// within the node cap
    fn effective_factor(&self, width: usize, height: usize) -> usize {
        let mut factor = self.downsample_factor.max(1);
        while width.div_ceil(factor) * height.div_ceil(factor) > self.max_nodes.max(1) {
            factor += 1;
        }
        factor
    }

    fn build_features(&self, image: &Image, factor: usize) -> FeatureGrid {
        let gw = image.width().div_ceil(factor);
        let gh = image.height().div_ceil(factor);

        let mut sums = vec![[0.0f64; 3]; gw * gh];
        let mut counts = vec![0usize; gw * gh];
        for y in 0..image.height() {
            for x in 0..image.width() {
                let node = (y / factor) * gw + x / factor;
                let px = image.get(x, y);
                for (s, &c) in sums[node].iter_mut().zip(px.iter()) {
                    *s += f64::from(c);
                }
                counts[node] += 1;
            }
        }

        let mut nodes: Vec<FeatureNode> = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| {
                let mean = |c: usize| (sum[c] / count as f64) as f32;
                let (r, g, b) = (mean(0), mean(1), mean(2));
                FeatureNode {
                    intensity: (r + g + b) / 3.0,
                    red_green: r - g,
                    blue_yellow: b - (r + g) / 2.0,
                    edge: 0.0,
                }
            })
            .collect();

        // Sobel over the coarse intensity grid, replicate border; the 1/4
        // scale keeps a unit step at magnitude 1.
        let intensity = |x: isize, y: isize| {
            let cx = x.clamp(0, gw as isize - 1) as usize;
            let cy = y.clamp(0, gh as isize - 1) as usize;
            nodes[cy * gw + cx].intensity
        };
        let edges: Vec<f32> = (0..gw * gh)
            .map(|i| {
                let (x, y) = ((i % gw) as isize, (i / gw) as isize);
                let gx = intensity(x + 1, y - 1)
                    + 2.0 * intensity(x + 1, y)
                    + intensity(x + 1, y + 1)
                    - intensity(x - 1, y - 1)
                    - 2.0 * intensity(x - 1, y)
                    - intensity(x - 1, y + 1);
                let gy = intensity(x - 1, y + 1)
                    + 2.0 * intensity(x, y + 1)
                    + intensity(x + 1, y + 1)
                    - intensity(x - 1, y - 1)
                    - 2.0 * intensity(x, y - 1)
                    - intensity(x + 1, y - 1);
                (gx * gx + gy * gy).sqrt() / 4.0 * self.edge_weight
            })
            .collect();
        for (node, edge) in nodes.iter_mut().zip(edges) {
            node.edge = edge;
        }

        FeatureGrid {
            width: gw,
            height: gh,
            cell: factor,
            nodes,
        }
    }

    fn solve(&self, weights: Vec<f64>, n: usize, stage: &'static str) -> Result<Equilibrium> {
        let matrix = TransitionMatrix::from_weights(n, weights)?;
        let eq = stationary_distribution(&matrix, self.tolerance, self.max_iterations);
        if eq.converged {
            debug!(stage, iterations = eq.iterations, nodes = n, "markov chain converged");
        } else {
            warn!(
                stage,
                iterations = eq.iterations,
                nodes = n,
                "markov chain did not converge, using last iterate"
            );
        }
        Ok(eq)
    }

    /// Coarse node saliency and whether every solve converged
    fn node_saliency(&self, grid: &FeatureGrid) -> Result<(Vec<f32>, bool)> {
        let n = grid.len();
        let sigma = (self.sigma_fraction * grid.width.max(grid.height) as f32).max(1e-3);

        let activation_weights = grid.weights(sigma, |i, j| grid.nodes[i].distance(&grid.nodes[j]));
        let activation = self.solve(activation_weights, n, "activation")?;
        let mut converged = activation.converged;
        let mut mass = activation.distribution;

        // A flat activation has nothing to concentrate; the spatial kernel alone
        // would only add a border falloff.
        let (lo, hi) = mass
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        if hi - lo <= FLAT_ACTIVATION_EPSILON * hi {
            debug!(nodes = n, "flat activation, skipping normalization stage");
            return Ok((vec![0.0; n], converged));
        }

        if self.two_stage {
            let scores: Vec<f32> = mass.iter().map(|&p| p as f32).collect();
            let normalization_weights = grid.weights(sigma, |_, j| scores[j]);
            let normalization = self.solve(normalization_weights, n, "normalization")?;
            converged &= normalization.converged;
            mass = normalization.distribution;
        }

        Ok((mass.into_iter().map(|p| p as f32).collect(), converged))
    }

    /// Bilinear interpolation of node values at pixel resolution
    fn upsample(grid: &FeatureGrid, values: &[f32], width: usize, height: usize) -> Vec<f32> {
        let cell = grid.cell as f32;
        let max_x = (grid.width - 1) as f32;
        let max_y = (grid.height - 1) as f32;
        let mut out = Vec::with_capacity(width * height);
        for y in 0..height {
            let fy = ((y as f32 + 0.5) / cell - 0.5).clamp(0.0, max_y);
            let y0 = fy.floor() as usize;
            let y1 = (y0 + 1).min(grid.height - 1);
            let ty = fy - y0 as f32;
            for x in 0..width {
                let fx = ((x as f32 + 0.5) / cell - 0.5).clamp(0.0, max_x);
                let x0 = fx.floor() as usize;
                let x1 = (x0 + 1).min(grid.width - 1);
                let tx = fx - x0 as f32;

                let row0 = &values[y0 * grid.width..(y0 + 1) * grid.width];
                let row1 = &values[y1 * grid.width..(y1 + 1) * grid.width];
                let top = row0[x0] * (1.0 - tx) + row0[x1] * tx;
                let bottom = row1[x0] * (1.0 - tx) + row1[x1] * tx;
                out.push(top * (1.0 - ty) + bottom * ty);
            }
        }
        out
    }

    /// Compute the saliency map of an image
    pub fn compute(&self, image: &Image) -> Result<SaliencyMap> {
        let (width, height) = (image.width(), image.height());
        let factor = self.effective_factor(width, height);
        if factor != self.downsample_factor {
            debug!(
                requested = self.downsample_factor,
                factor, "downsample factor raised to respect node cap"
            );
        }

        let grid = self.build_features(image, factor);
        let (node_values, converged) = self.node_saliency(&grid)?;
        let values = Self::upsample(&grid, &node_values, width, height);

        Ok(SaliencyMap::new(width, height, values)?
            .normalized()
            .with_approximate(!converged))
    }
}

impl SaliencyEstimator for GraphBasedSaliency {
    fn name(&self) -> &'static str {
        "graph_based"
    }

    fn estimate(&self, image: &Image, _lab: &LabImage) -> Result<SaliencyMap> {
        self.compute(image)
    }
}
