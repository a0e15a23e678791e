//! Separable Gaussian low-pass filter
//!
//! Borders replicate the edge pixel. Rows are filtered in parallel; each
//! output value is summed in a fixed order so results do not depend on
//! scheduling.

use rayon::prelude::*;

/// Normalized 1-D Gaussian kernel of length `2 * radius + 1`
///
/// Sigma follows the usual derivation from the kernel size,
/// `0.3 * ((ksize - 1) / 2 - 1) + 0.8`, so radius 2 gives a 5-tap kernel
/// with sigma 1.1.
pub fn gaussian_kernel(radius: usize) -> Vec<f32> {
    if radius == 0 {
        return vec![1.0];
    }
    let sigma = 0.3 * (radius as f32 - 1.0) + 0.8;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Blur an `N`-channel row-major image
pub fn gaussian_blur<const N: usize>(
    width: usize,
    height: usize,
    data: &[[f32; N]],
    radius: usize,
) -> Vec<[f32; N]> {
    debug_assert_eq!(data.len(), width * height);
    if radius == 0 || data.is_empty() {
        return data.to_vec();
    }

    let kernel = gaussian_kernel(radius);
    let offset = radius as isize;

    let mut horizontal = vec![[0.0f32; N]; data.len()];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &data[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = [0.0f32; N];
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = clamp_index(x as isize + k as isize - offset, width);
                    for (a, v) in acc.iter_mut().zip(src[sx].iter()) {
                        *a += w * v;
                    }
                }
                *out = acc;
            }
        });

    let mut output = vec![[0.0f32; N]; data.len()];
    output
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = [0.0f32; N];
                for (k, &w) in kernel.iter().enumerate() {
                    let sy = clamp_index(y as isize + k as isize - offset, height);
                    for (a, v) in acc.iter_mut().zip(horizontal[sy * width + x].iter()) {
                        *a += w * v;
                    }
                }
                *out = acc;
            }
        });

    output
}

/// Blur a single-channel row-major image
pub fn gaussian_blur_scalar(width: usize, height: usize, data: &[f32], radius: usize) -> Vec<f32> {
    let wrapped: Vec<[f32; 1]> = data.iter().map(|&v| [v]).collect();
    gaussian_blur(width, height, &wrapped, radius)
        .into_iter()
        .map(|[v]| v)
        .collect()
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}
