//! Image normalization ahead of OCR.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, ImageDecoder, ImageReader};
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::config::OcrConfig;

/// Image preprocessor for the OCR pipeline.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
    /// Percentage of pixels clipped from each histogram tail.
    clip_percent: f32,
    sharpen_sigma: f32,
    sharpen_threshold: i32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&OcrConfig::default())
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            max_size: config.max_image_size,
            clip_percent: config.contrast_clip_percent,
            sharpen_sigma: config.sharpen_sigma,
            sharpen_threshold: config.sharpen_threshold,
        }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Decode an image and normalize it for recognition.
    ///
    /// Applies EXIF orientation, downscales, converts to grayscale, stretches
    /// contrast and sharpens.
    pub fn prepare(&self, bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);

        let (orig_width, orig_height) = image.dimensions();
        let (width, height) =
            self.calculate_resize_dimensions(orig_width, orig_height, self.max_size);
        if (width, height) != (orig_width, orig_height) {
            image = image.resize_exact(width, height, FilterType::Lanczos3);
        }
        debug!(
            "Prepared image {}x{} -> {}x{}",
            orig_width, orig_height, width, height
        );

        let gray = self.stretch_contrast(&image.to_luma8());
        let sharpened = imageops::unsharpen(&gray, self.sharpen_sigma, self.sharpen_threshold);

        Ok(DynamicImage::ImageLuma8(sharpened))
    }

    /// Linearly remap intensities so the clipped range spans 0-255.
    ///
    /// Images whose clipped range is empty (flat images) are returned unchanged.
    pub fn stretch_contrast(&self, image: &GrayImage) -> GrayImage {
        let mut histogram = [0u64; 256];
        for pixel in image.pixels() {
            histogram[pixel[0] as usize] += 1;
        }

        let total: u64 = histogram.iter().sum();
        if total == 0 {
            return image.clone();
        }

        let clip = (total as f64 * f64::from(self.clip_percent.clamp(0.0, 50.0)) / 100.0) as u64;
        let low = percentile_bound(histogram.iter().enumerate(), clip);
        let high = percentile_bound(histogram.iter().enumerate().rev(), clip);

        if high <= low {
            return image.clone();
        }

        let range = f32::from(high - low);
        let mut result = image.clone();
        for pixel in result.pixels_mut() {
            let value = f32::from(pixel[0].clamp(low, high) - low) * 255.0 / range;
            pixel[0] = value.round() as u8;
        }
        result
    }

    fn calculate_resize_dimensions(
        &self,
        width: u32,
        height: u32,
        target_size: u32,
    ) -> (u32, u32) {
        let max_dim = width.max(height);

        if max_dim <= target_size {
            return (width, height);
        }

        let scale = target_size as f32 / max_dim as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        (new_width.max(1), new_height.max(1))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// First intensity at which more than `clip` pixels have been seen.
fn percentile_bound<'a>(bins: impl Iterator<Item = (usize, &'a u64)>, clip: u64) -> u8 {
    let mut seen = 0u64;
    for (value, count) in bins {
        seen += count;
        if seen > clip {
            return value as u8;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma};
    use pretty_assertions::assert_eq;

    fn gradient(width: u32, height: u32, from: u8, to: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            let t = x as f32 / (width - 1) as f32;
            Luma([(from as f32 + t * (to - from) as f32).round() as u8])
        })
    }

    #[test]
    fn test_resize_dimensions() {
        let preprocessor = ImagePreprocessor::new();

        // Image smaller than target
        let (w, h) = preprocessor.calculate_resize_dimensions(500, 300, 960);
        assert_eq!((w, h), (500, 300));

        // Image larger than target
        let (w, h) = preprocessor.calculate_resize_dimensions(1920, 1080, 960);
        assert_eq!(w, 960);
        assert!(h < 960);
    }

    #[test]
    fn test_stretch_contrast_spans_full_range() {
        let preprocessor = ImagePreprocessor::new();
        let stretched = preprocessor.stretch_contrast(&gradient(101, 1, 100, 150));

        let min = stretched.pixels().map(|p| p[0]).min().unwrap();
        let max = stretched.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn test_stretch_contrast_flat_image_unchanged() {
        let preprocessor = ImagePreprocessor::new();
        let flat = GrayImage::from_pixel(8, 8, Luma([77]));

        assert_eq!(preprocessor.stretch_contrast(&flat), flat);
    }

    #[test]
    fn test_prepare_png() {
        let source = DynamicImage::ImageLuma8(gradient(200, 100, 40, 200));
        let mut bytes = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let prepared = ImagePreprocessor::new()
            .with_max_size(64)
            .prepare(&bytes)
            .unwrap();

        assert_eq!(prepared.dimensions(), (64, 32));
        assert!(matches!(prepared, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let result = ImagePreprocessor::new().prepare(b"definitely not an image");
        assert!(matches!(result, Err(ExtractionError::Image(_))));
    }
}
