//! Receipt data models.

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dedup::{fingerprint, DedupKey};
use crate::error::{ExtractionError, RcptError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "tiff", "tif", "bmp", "gif"];

/// Kind of a raw document, selecting the extraction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Photographed or scanned receipt.
    Image,
    /// PDF with an embedded text layer.
    Pdf,
}

impl DocumentKind {
    /// Infer the kind from a file extension and/or a declared media type.
    ///
    /// Either signal naming PDF wins; otherwise a known image extension or an
    /// `image/*` media type selects [`DocumentKind::Image`].
    pub fn detect(extension: Option<&str>, media_type: Option<&str>) -> Option<Self> {
        let extension = extension
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .unwrap_or_default();
        let media_type = media_type.map(|m| m.to_lowercase()).unwrap_or_default();

        if extension == "pdf" || media_type == "application/pdf" {
            return Some(Self::Pdf);
        }

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) || media_type.starts_with("image/") {
            return Some(Self::Image);
        }

        None
    }

    /// Infer the kind from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::detect(path.extension().and_then(|e| e.to_str()), None)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Image => write!(f, "image"),
            DocumentKind::Pdf => write!(f, "pdf"),
        }
    }
}

/// Raw document bytes plus the declared kind.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }

    /// Read a document from disk, detecting its kind from the extension.
    pub fn from_path(path: &Path) -> Result<Self, RcptError> {
        let kind = DocumentKind::from_path(path).ok_or_else(|| {
            ExtractionError::Unsupported(format!("unrecognized file type: {}", path.display()))
        })?;
        let bytes = std::fs::read(path)?;
        Ok(Self { bytes, kind })
    }
}

/// Text produced by a [`crate::TextExtractor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Plain text, lines separated by `\n`.
    pub text: String,

    /// OCR confidence (0 - 100, two decimals). Absent for PDF sources.
    pub confidence: Option<f64>,
}

impl ExtractedText {
    /// Text recognized by OCR; a missing confidence signal counts as 0.
    pub fn from_ocr(text: String, confidence: Option<f32>) -> Self {
        let confidence = f64::from(confidence.unwrap_or(0.0));
        Self {
            text,
            confidence: Some((confidence * 100.0).round() / 100.0),
        }
    }

    /// Text read from a PDF text layer.
    pub fn from_text_layer(text: String) -> Self {
        Self {
            text,
            confidence: None,
        }
    }
}

/// Spending category of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coffee,
    Water,
    Beverages,
    Snack,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coffee => "coffee",
            Category::Water => "water",
            Category::Beverages => "beverages",
            Category::Snack => "snack",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single accepted product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Position among accepted items, starting at 1.
    pub line_no: u32,

    /// Product name as printed, trimmed.
    pub product_name: String,

    /// Quantity (may be fractional, e.g. weighed goods).
    #[serde(with = "rust_decimal::serde::float")]
    pub qty: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,

    /// Line total, always positive.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,

    pub category: Category,
}

/// Fields parsed out of receipt text.
///
/// Every field is independently optional; a missing store name does not
/// prevent the total or the items from being found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    pub store_name: Option<String>,

    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub total_amount: Option<Decimal>,

    pub purchase_datetime: Option<NaiveDateTime>,

    /// Accepted items in acceptance order.
    pub items: Vec<LineItem>,
}

impl ParsedReceipt {
    /// Check if nothing at all was recognized.
    pub fn is_empty(&self) -> bool {
        self.store_name.is_none()
            && self.total_amount.is_none()
            && self.purchase_datetime.is_none()
            && self.items.is_empty()
    }

    /// Fingerprint of this receipt for duplicate rejection.
    pub fn dedup_key(&self, store_identity: Option<&str>) -> DedupKey {
        fingerprint(store_identity, self.purchase_datetime, self.total_amount)
    }

    /// Sum of accepted line totals.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(|i| i.total_price).sum()
    }
}

/// Final output of the ingestion pipeline, handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    #[serde(flatten)]
    pub receipt: ParsedReceipt,

    /// OCR confidence, present only for image sources.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ocr_confidence: Option<f64>,

    pub source_kind: DocumentKind,

    /// Text the fields were parsed from.
    pub raw_text: String,
}

impl ReceiptRecord {
    /// Fingerprint of this record for duplicate rejection.
    pub fn dedup_key(&self, store_identity: Option<&str>) -> DedupKey {
        self.receipt.dedup_key(store_identity)
    }

    /// Keep only the first `max` items. Returns how many were dropped.
    pub fn truncate_items(&mut self, max: usize) -> usize {
        let dropped = self.receipt.items.len().saturating_sub(max);
        self.receipt.items.truncate(max);
        dropped
    }
}
