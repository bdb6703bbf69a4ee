//! Text extraction from raw receipt documents.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::ExtractionError;
use crate::models::config::OcrConfig;
use crate::models::receipt::{DocumentKind, ExtractedText, RawDocument};
use crate::ocr::{DisabledOcr, ImagePreprocessor, OcrEngineProvider, OcrSession};
use crate::pdf::PdfExtractor;

/// Turns raw documents into plain text.
///
/// Images go through normalization and OCR with an engine acquired for the
/// call; PDFs are read from their text layer.
pub struct TextExtractor<P: OcrEngineProvider> {
    ocr: P,
    preprocessor: ImagePreprocessor,
}

impl<P: OcrEngineProvider> TextExtractor<P> {
    pub fn new(ocr: P, config: &OcrConfig) -> Self {
        Self {
            ocr,
            preprocessor: ImagePreprocessor::from_config(config),
        }
    }

    /// Extract the text of a document.
    pub fn extract(&self, document: &RawDocument) -> Result<ExtractedText, ExtractionError> {
        let start = Instant::now();
        info!(
            "Extracting text from {} document ({} bytes)",
            document.kind,
            document.bytes.len()
        );

        let extracted = match document.kind {
            DocumentKind::Pdf => {
                ExtractedText::from_text_layer(PdfExtractor::text_from_bytes(&document.bytes)?)
            }
            DocumentKind::Image => self.recognize_image(&document.bytes)?,
        };

        debug!(
            "Extracted {} characters in {}ms (confidence {:?})",
            extracted.text.len(),
            start.elapsed().as_millis(),
            extracted.confidence
        );

        Ok(extracted)
    }

    fn recognize_image(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let image = self.preprocessor.prepare(bytes)?;

        let mut session = OcrSession::open(&self.ocr)?;
        let recognition = session.recognize(&image)?;

        Ok(ExtractedText::from_ocr(
            recognition.text,
            recognition.confidence,
        ))
    }
}

impl TextExtractor<DisabledOcr> {
    /// Extractor for PDFs only; images fail with an unavailable OCR error.
    pub fn pdf_only(config: &OcrConfig) -> Self {
        Self::new(DisabledOcr, config)
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};

    let image = GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
