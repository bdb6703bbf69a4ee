//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{merge_regions, OcrEngine, OcrEngineProvider, Recognition, TextRegion};

/// Provider that loads a `pure-onnx-ocr` engine from a model directory.
#[derive(Debug, Clone)]
pub struct PureOcrProvider {
    models: ModelConfig,
    keep_unk: bool,
}

impl PureOcrProvider {
    pub fn new(models: ModelConfig, ocr: &OcrConfig) -> Self {
        Self {
            models,
            keep_unk: ocr.keep_unk,
        }
    }
}

impl OcrEngineProvider for PureOcrProvider {
    type Engine = PureOcrEngine;

    fn acquire(&self) -> Result<PureOcrEngine, OcrError> {
        if !self.models.is_complete() {
            return Err(OcrError::ModelLoad(format!(
                "model files missing in {}",
                self.models.model_dir.display()
            )));
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&self.models.detection_path())
            .rec_model_path(&self.models.recognition_path())
            .dictionary_path(&self.models.dictionary_path())
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!(
            "Loaded pure-onnx-ocr engine from {}",
            self.models.model_dir.display()
        );

        Ok(PureOcrEngine {
            engine: Some(engine),
            keep_unk: self.keep_unk,
        })
    }
}

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: Option<pure_onnx_ocr::engine::OcrEngine>,
    keep_unk: bool,
}

impl OcrEngine for PureOcrEngine {
    fn recognize(&mut self, image: &DynamicImage) -> Result<Recognition, OcrError> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| OcrError::Unavailable("engine already terminated".to_string()))?;

        let start = Instant::now();
        let (width, height) = image.dimensions();
        info!("Recognizing image: {}x{}", width, height);

        // The detector expects three channels.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

        let results = engine
            .run_from_image(&rgb)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let regions: Vec<TextRegion> = results
            .iter()
            .map(|r| TextRegion {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
                confidence: r.confidence,
            })
            .collect();

        let region_count = regions.len();
        let recognition = merge_regions(regions);

        info!(
            "OCR complete: {} text regions in {}ms",
            region_count,
            start.elapsed().as_millis()
        );

        Ok(recognition)
    }

    fn terminate(&mut self) {
        self.engine = None;
    }
}

/// Convert a `Polygon<f64>` to the `[f32; 8]` quadrilateral of a [`TextRegion`].
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let models = ModelConfig {
            model_dir: dir.path().to_path_buf(),
            ..ModelConfig::default()
        };

        let provider = PureOcrProvider::new(models, &OcrConfig::default());
        assert!(matches!(provider.acquire(), Err(OcrError::ModelLoad(_))));
    }
}
