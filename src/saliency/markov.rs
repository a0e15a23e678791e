//! Dense Markov-chain equilibrium solver
//!
//! The graph-based estimator describes its graph as a dense `n x n` weight
//! matrix indexed by node number. [`TransitionMatrix`] row-normalizes it and
//! [`stationary_distribution`] finds the equilibrium by power iteration.

use rayon::prelude::*;

use crate::{AnalysisError, Result};

/// Output columns handled per parallel task in a power-iteration step
const COLUMN_CHUNK: usize = 64;

/// Row-stochastic transition matrix, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    size: usize,
    data: Vec<f64>,
}

impl TransitionMatrix {
    /// Row-normalize a dense non-negative weight matrix
    ///
    /// A row without outgoing weight becomes a self-loop so the chain stays
    /// well defined.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the matrix is not `size x size`
    /// or holds a negative or non-finite weight.
    pub fn from_weights(size: usize, mut weights: Vec<f64>) -> Result<Self> {
        if size == 0 || weights.len() != size * size {
            return Err(AnalysisError::invalid_input(format!(
                "transition matrix needs {} weights, got {}",
                size * size,
                weights.len()
            )));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(AnalysisError::invalid_input(format!(
                "edge weight {} is negative or not finite",
                bad
            )));
        }

        for (i, row) in weights.chunks_mut(size).enumerate() {
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|w| *w /= total);
            } else {
                row[i] = 1.0;
            }
        }

        Ok(Self {
            size,
            data: weights,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transition probabilities out of node `i`
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// One step of the chain: `out = pi * P`
    pub fn step(&self, pi: &[f64], out: &mut [f64]) {
        let n = self.size;
        out.par_chunks_mut(COLUMN_CHUNK)
            .enumerate()
            .for_each(|(chunk, cols)| {
                let start = chunk * COLUMN_CHUNK;
                cols.iter_mut().for_each(|c| *c = 0.0);
                for (i, &p) in pi.iter().enumerate() {
                    if p == 0.0 {
                        continue;
                    }
                    let row = &self.data[i * n + start..i * n + start + cols.len()];
                    for (c, &t) in cols.iter_mut().zip(row) {
                        *c += p * t;
                    }
                }
            });
    }
}

/// Result of an equilibrium solve
#[derive(Debug, Clone, PartialEq)]
pub struct Equilibrium {
    /// Visitation probability per node, sums to 1
    pub distribution: Vec<f64>,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the L1 change dropped below the tolerance
    pub converged: bool,
}

/// Solve for the stationary distribution by lazy power iteration
///
/// Iterates `pi <- (pi + pi * P) / 2` from the uniform vector. The lazy step
/// has the same fixed point as `P` but cannot oscillate on periodic chains
/// such as a two-region image whose graph is bipartite. When the budget runs
/// out the last iterate is returned with `converged == false`.
pub fn stationary_distribution(
    matrix: &TransitionMatrix,
    tolerance: f64,
    max_iterations: usize,
) -> Equilibrium {
    let n = matrix.size();
    let mut pi = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];

    for iteration in 1..=max_iterations {
        matrix.step(&pi, &mut next);

        let mut total = 0.0;
        for (x, &p) in next.iter_mut().zip(&pi) {
            *x = 0.5 * (*x + p);
            total += *x;
        }
        if total > 0.0 {
            next.iter_mut().for_each(|x| *x /= total);
        }

        let delta: f64 = next.iter().zip(&pi).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut pi, &mut next);
        if delta < tolerance {
            return Equilibrium {
                distribution: pi,
                iterations: iteration,
                converged: true,
            };
        }
    }

    Equilibrium {
        distribution: pi,
        iterations: max_iterations,
        converged: false,
    }
}
