//! WASM bindings for receipt parsing.
//!
//! OCR is not available here; callers recognize images on their side and pass
//! the text in. PDF text layers can be read directly.

use chrono::NaiveDateTime;
use wasm_bindgen::prelude::*;

use rcpt_core::receipt::rules::parse_amount;
use rcpt_core::{
    DedupKey, ParsedReceipt, PdfExtractor, RcptConfig, ReceiptParser, RuleBasedParser,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[derive(serde::Serialize)]
struct ParseResult {
    #[serde(flatten)]
    receipt: ParsedReceipt,
    dedup_key: DedupKey,
}

fn parse_to_js(
    parser: &RuleBasedParser,
    text: &str,
    store_id: Option<String>,
) -> Result<JsValue, JsValue> {
    let receipt = parser.parse(text);
    let dedup_key = receipt.dedup_key(store_id.as_deref());

    serde_wasm_bindgen::to_value(&ParseResult { receipt, dedup_key }).map_err(to_js_error)
}

/// Parse receipt fields and items from text (from OCR or a PDF text layer).
#[wasm_bindgen]
pub fn parse_receipt_text(text: &str) -> Result<JsValue, JsValue> {
    parse_to_js(&RuleBasedParser::new(), text, None)
}

/// Category of a product name with the built-in table.
#[wasm_bindgen]
pub fn categorize(product_name: &str) -> String {
    rcpt_core::categorize::categorize(product_name)
        .as_str()
        .to_string()
}

/// Dedup fingerprint of a purchase.
///
/// `purchase_datetime` is `YYYY-MM-DDTHH:MM:SS`; `total_amount` accepts `,`
/// or `.` as the decimal separator.
#[wasm_bindgen]
pub fn fingerprint(
    store_identity: Option<String>,
    purchase_datetime: Option<String>,
    total_amount: Option<String>,
) -> Result<String, JsValue> {
    let datetime = purchase_datetime
        .map(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S"))
        .transpose()
        .map_err(to_js_error)?;

    let total = match total_amount {
        Some(s) => Some(
            parse_amount(&s)
                .ok_or_else(|| JsValue::from_str(&format!("invalid amount: {}", s)))?,
        ),
        None => None,
    };

    Ok(rcpt_core::fingerprint(store_identity.as_deref(), datetime, total).to_string())
}

/// Read the text layer of a PDF.
#[wasm_bindgen]
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, JsValue> {
    PdfExtractor::text_from_bytes(bytes).map_err(to_js_error)
}

/// Receipt parser class for browser use.
#[wasm_bindgen(js_name = ReceiptParser)]
pub struct WasmReceiptParser {
    parser: RuleBasedParser,
}

#[wasm_bindgen(js_class = ReceiptParser)]
impl WasmReceiptParser {
    /// Create a parser with the built-in merchant list.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: RuleBasedParser::new(),
        }
    }

    /// Create a parser with custom merchant patterns (array of strings).
    #[wasm_bindgen(js_name = withMerchantPatterns)]
    pub fn with_merchant_patterns(patterns: js_sys::Array) -> Result<WasmReceiptParser, JsValue> {
        let mut config = RcptConfig::default();
        config.parser.merchant_patterns = patterns.iter().filter_map(|p| p.as_string()).collect();

        let parser = RuleBasedParser::from_config(&config).map_err(to_js_error)?;
        Ok(Self { parser })
    }

    /// Parse receipt text.
    #[wasm_bindgen]
    pub fn parse(&self, text: &str) -> Result<JsValue, JsValue> {
        parse_to_js(&self.parser, text, None)
    }

    /// Parse receipt text, fingerprinting with a store identity.
    #[wasm_bindgen(js_name = parseWithStore)]
    pub fn parse_with_store(&self, text: &str, store_id: String) -> Result<JsValue, JsValue> {
        parse_to_js(&self.parser, text, Some(store_id))
    }
}

impl Default for WasmReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}
