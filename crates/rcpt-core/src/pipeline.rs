//! End-to-end receipt ingestion: extract, parse, categorize.

use tracing::info;

use crate::error::{ExtractionError, RcptError};
use crate::extract::TextExtractor;
use crate::models::config::RcptConfig;
use crate::models::receipt::{RawDocument, ReceiptRecord};
use crate::ocr::OcrEngineProvider;
use crate::receipt::{ReceiptParser, RuleBasedParser};

/// Receipt ingestion pipeline.
pub struct ReceiptPipeline<P: OcrEngineProvider> {
    extractor: TextExtractor<P>,
    parser: RuleBasedParser,
}

impl<P: OcrEngineProvider> ReceiptPipeline<P> {
    pub fn new(extractor: TextExtractor<P>, parser: RuleBasedParser) -> Self {
        Self { extractor, parser }
    }

    /// Build a pipeline from configuration and an OCR provider.
    pub fn from_config(ocr: P, config: &RcptConfig) -> Result<Self, RcptError> {
        Ok(Self {
            extractor: TextExtractor::new(ocr, &config.ocr),
            parser: RuleBasedParser::from_config(config)?,
        })
    }

    pub fn parser(&self) -> &RuleBasedParser {
        &self.parser
    }

    /// Turn a raw document into a receipt record.
    ///
    /// Fails only when no text can be extracted; missing receipt fields are
    /// reported as empty values on the record.
    pub fn process(&self, document: &RawDocument) -> Result<ReceiptRecord, ExtractionError> {
        let extracted = self.extractor.extract(document)?;
        let receipt = self.parser.parse(&extracted.text);

        info!(
            "Processed {} receipt: {} items, store={:?}",
            document.kind,
            receipt.items.len(),
            receipt.store_name
        );

        Ok(ReceiptRecord {
            receipt,
            ocr_confidence: extracted.confidence,
            source_kind: document.kind,
            raw_text: extracted.text,
        })
    }
}
