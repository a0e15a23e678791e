//! Image file loading
//!
//! Decodes common raster formats with the `image` crate and converts them to
//! the crate's [`Image`] (sRGB, channels in `[0, 1]`). Alpha is dropped and
//! 16-bit sources are reduced to 8 bits per channel.
//!
//! ## Supported Formats
//!
//! JPEG, PNG, WebP, TIFF, BMP

use std::path::Path;

use ::image::{DynamicImage, ImageReader, RgbImage};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::image::Image;

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Bmp,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }
}

/// Load an image from disk
///
/// # Errors
///
/// Returns `AnalysisError::ImageLoadError` if the file cannot be opened or
/// decoded, and `AnalysisError::InvalidInput` for an unknown extension or an
/// image without pixels.
///
/// # Example
///
/// ```rust,no_run
/// use salient_palette::image_loader::load_image;
/// use std::path::Path;
///
/// let image = load_image(Path::new("photo.jpg"))?;
/// println!("Loaded image: {}x{}", image.width(), image.height());
/// # Ok::<(), salient_palette::AnalysisError>(())
/// ```
pub fn load_image(path: &Path) -> Result<Image> {
    if ImageFormat::from_extension(path).is_none() {
        return Err(AnalysisError::invalid_input(format!(
            "unknown image format for file: {}",
            path.display()
        )));
    }

    let reader = ImageReader::open(path).map_err(|e| {
        AnalysisError::image_load(format!("Failed to open image file: {}", path.display()), e)
    })?;

    let decoded: DynamicImage = reader.decode().map_err(|e| {
        AnalysisError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    debug!(
        path = %path.display(),
        width = decoded.width(),
        height = decoded.height(),
        "image decoded"
    );
    Image::from_rgb_image(&decoded.to_rgb8())
}

impl Image {
    /// Convert an 8-bit RGB buffer from the `image` crate
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the buffer has no pixels.
    pub fn from_rgb_image(rgb: &RgbImage) -> Result<Image> {
        let (width, height) = rgb.dimensions();
        Image::from_rgb8(width as usize, height as usize, rgb.as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::Rgb;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ImageFormat::from_extension(Path::new("photo.jpg")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("photo.JPEG")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("scan.tif")),
            Some(ImageFormat::Tiff)
        );
        assert_eq!(ImageFormat::from_extension(Path::new("photo.xyz")), None);
        assert_eq!(ImageFormat::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_unsupported_extension_rejected_before_open() {
        assert_eq!(ImageFormat::from_extension(Path::new("photo.heic")), None);
        let err = load_image(Path::new("/nonexistent/photo.heic")).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
    }

    #[test]
    fn test_from_rgb_image() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 0, 255]));

        let image = Image::from_rgb_image(&rgb).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.get(0, 0), [1.0, 0.0, 0.0]);
        assert_eq!(image.get(1, 0), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_png_file_round_trip() {
        let path = std::env::temp_dir().join(format!("salient_palette_{}.png", std::process::id()));
        let rgb = RgbImage::from_pixel(3, 2, Rgb([10, 200, 30]));
        rgb.save(&path).unwrap();

        let image = load_image(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(image.len(), 6);
        assert_eq!(image.get(2, 1), [10.0 / 255.0, 200.0 / 255.0, 30.0 / 255.0]);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            load_image(Path::new("notes.txt")),
            Err(AnalysisError::InvalidInput { .. })
        ));
        assert!(matches!(
            load_image(Path::new("/nonexistent/photo.png")),
            Err(AnalysisError::ImageLoadError { .. })
        ));
    }
}
