//! Color conversion and swatch formatting module
//!
//! This module handles color space conversions and turns cluster centroids
//! into display-ready palette swatches with their statistics.

pub mod conversion;
pub mod swatch;

pub use conversion::{Cmyk, ColorConverter};
pub use swatch::{PaletteSwatch, PaletteTotals, SwatchFormatter};
