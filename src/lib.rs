//! # Salient Palette
//!
//! Extracts a representative color palette from an image, weighting every pixel
//! by how much it attracts the eye.
//!
//! The pipeline:
//! - Converts sRGB pixels to CIE Lab (D65)
//! - Estimates saliency twice: frequency-tuned contrast and a graph-based
//!   Markov-chain model
//! - Fuses and smooths the two maps
//! - Clusters Lab colors with a saliency-weighted k-means
//! - Reports each swatch as hex, RGB, CMYK and Lab with its saliency mass
//!
//! ## Example
//!
//! ```rust,no_run
//! use salient_palette::{extract_palette, image_loader, PaletteConfig};
//! use std::path::Path;
//!
//! let image = image_loader::load_image(Path::new("photo.jpg"))?;
//! let palette = extract_palette(&image, 5, &PaletteConfig::default())?;
//! for swatch in &palette.swatches {
//!     println!("{} mass={:.3}", swatch.hex, swatch.saliency_mass);
//! }
//! # Ok::<(), salient_palette::AnalysisError>(())
//! ```

pub mod clustering;
pub mod color;
pub mod config;
pub mod constants;
pub mod error;
pub mod image;
pub mod image_loader;
pub mod pipeline;
pub mod saliency;

pub use color::{Cmyk, ColorConverter, PaletteSwatch};
pub use config::PaletteConfig;
pub use error::{AnalysisError, Result};
pub use image::{Image, LabImage};
pub use pipeline::{extract_palette, Palette, PaletteMetadata};
pub use saliency::{SaliencyMap, SaliencyStats};
