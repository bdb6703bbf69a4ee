//! Error types for the rcpt-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Text could not be extracted from a document.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Fatal failure to turn a raw document into text.
///
/// Extraction is all-or-nothing: whenever one of these is returned no
/// partial text is available.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// The image could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The document kind is not supported.
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// The caller's deadline expired before extraction finished.
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// No OCR engine is available in this build or configuration.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
