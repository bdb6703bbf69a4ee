//! PDF text extraction using lopdf and pdf-extract.

use std::panic;

use lopdf::Document;
use tracing::{debug, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// PDF text extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Load a PDF and return its text layer.
    pub fn text_from_bytes(data: &[u8]) -> Result<String> {
        let mut extractor = Self::new();
        extractor.load(data)?;
        extractor.extract_text()
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }

        // pdf-extract panics on some malformed fonts and content streams.
        let data = self.raw_data.as_slice();
        let text = panic::catch_unwind(move || pdf_extract::extract_text_from_mem(data))
            .map_err(|_| PdfError::TextExtraction("text layer decoder panicked".to_string()))?
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        if text.trim().is_empty() {
            warn!("PDF has no text layer; scanned PDFs are not OCRed");
        } else {
            debug!("Extracted {} characters from PDF text layer", text.len());
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use pretty_assertions::assert_eq;

    fn one_page_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
    }

    #[test]
    fn test_extract_without_document() {
        assert!(matches!(
            PdfExtractor::new().extract_text(),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let result = PdfExtractor::text_from_bytes(b"not a pdf at all");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_load_generated_pdf() {
        let bytes = one_page_pdf(&["KAUFLAND", "TOTAL 15,00"]);

        let mut extractor = PdfExtractor::new();
        extractor.load(&bytes).unwrap();

        assert_eq!(extractor.page_count(), 1);
        let text = extractor.extract_text().unwrap();
        assert!(text.contains("KAUFLAND"));
        assert!(text.contains("TOTAL 15,00"));
    }

    #[test]
    fn test_text_layer_parses_into_receipt() {
        use crate::models::receipt::Category;
        use crate::receipt::{ReceiptParser, RuleBasedParser};
        use chrono::NaiveDate;
        use rust_decimal::Decimal;
        use std::str::FromStr;

        let bytes = one_page_pdf(&[
            "KAUFLAND",
            "ESPRESSO 2 x 7,50 15,00",
            "TOTAL 15,00",
            "2024-05-01 10:00",
        ]);

        let text = PdfExtractor::text_from_bytes(&bytes).unwrap();
        let receipt = RuleBasedParser::new().parse(&text);
        let dec = |s: &str| Decimal::from_str(s).unwrap();

        assert_eq!(receipt.store_name.as_deref(), Some("KAUFLAND"));
        assert_eq!(receipt.total_amount, Some(dec("15.00")));
        assert_eq!(
            receipt.purchase_datetime,
            NaiveDate::from_ymd_opt(2024, 5, 1).and_then(|d| d.and_hms_opt(10, 0, 0))
        );
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].product_name, "ESPRESSO");
        assert_eq!(receipt.items[0].qty, dec("2"));
        assert_eq!(receipt.items[0].total_price, dec("15.00"));
        assert_eq!(receipt.items[0].category, Category::Coffee);
    }
}
