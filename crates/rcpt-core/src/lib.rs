//! Core library for receipt ingestion.
//!
//! This crate provides:
//! - Text extraction from receipt documents (OCR for images, text layer for PDFs)
//! - Heuristic receipt field and line-item parsing
//! - Keyword-based item categorization
//! - Deduplication fingerprints for parsed receipts

pub mod categorize;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod receipt;

pub use categorize::{CategoryRule, CategoryTable};
pub use dedup::{fingerprint, DedupKey};
pub use error::{ExtractionError, OcrError, PdfError, RcptError, Result};
pub use extract::TextExtractor;
pub use models::config::RcptConfig;
pub use models::receipt::{
    Category, DocumentKind, ExtractedText, LineItem, ParsedReceipt, RawDocument, ReceiptRecord,
};
pub use ocr::{DisabledOcr, OcrEngine, OcrEngineProvider, OcrSession, Recognition};
#[cfg(feature = "native")]
pub use ocr::{PureOcrEngine, PureOcrProvider};
pub use pdf::{PdfExtractor, PdfProcessor};
pub use pipeline::ReceiptPipeline;
pub use receipt::{ReceiptParser, RuleBasedParser};
