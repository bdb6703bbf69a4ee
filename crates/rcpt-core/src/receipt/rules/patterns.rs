//! Common regex patterns for receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Known merchants and legal-entity markers, as case-insensitive regex fragments.
pub const DEFAULT_MERCHANT_PATTERNS: &[&str] = &[
    r"s\.?c\.?",
    "kaufland",
    "lidl",
    "profi",
    "carrefour",
    "mega",
    "penny",
    "dm",
    "hornbach",
    "dedeman",
    "starbucks",
    "5 to go",
    "tazz",
    "glovo",
    "cora",
];

/// Two-decimal amount with either `,` or `.` as the decimal separator.
pub const AMOUNT: &str = r"[0-9]+[.,][0-9]{2}";

/// Build a case-insensitive alternation of merchant patterns.
pub fn merchant_regex<S: AsRef<str>>(patterns: &[S]) -> Result<Regex, regex::Error> {
    let alternation = patterns
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{})", alternation))
}

lazy_static! {
    pub static ref MERCHANT: Regex = merchant_regex(DEFAULT_MERCHANT_PATTERNS).unwrap();

    // Labelled total ("TOTAL 23,50", "SUMA: 23.50")
    pub static ref TOTAL_LABELED: Regex = Regex::new(
        &format!(r"(?i)(?:TOTAL|SUMA)[\s:]*({})", AMOUNT)
    ).unwrap();

    // Lines that summarize the receipt rather than list a product
    pub static ref SUMMARY_LINE: Regex = Regex::new(
        r"(?i)^(?:SUB\s*)?(?:TOTAL|SUMA)\b"
    ).unwrap();

    // YYYY-MM-DD (also . and /), optionally followed by HH:MM
    pub static ref PURCHASE_DATETIME: Regex = Regex::new(
        r"\b(\d{4})[-./](\d{2})[-./](\d{2})(?:\s*(\d{2}):(\d{2}))?"
    ).unwrap();

    // "ESPRESSO 2 x 7,50 15,00"
    pub static ref ITEM_QTY_PRICE: Regex = Regex::new(
        &format!(r"^(.+?)\s+(\d+(?:[.,]\d+)?)\s*[xX×]\s*({amount})\s+({amount})$", amount = AMOUNT)
    ).unwrap();

    // "CROISSANT 6,50"
    pub static ref ITEM_NAME_PRICE: Regex = Regex::new(
        &format!(r"^(.+?)\s+({})$", AMOUNT)
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merchant_regex_is_case_insensitive() {
        assert!(MERCHANT.is_match("Kaufland Romania SCS"));
        assert!(MERCHANT.is_match("S.C. EXEMPLU S.R.L."));
        assert!(!MERCHANT.is_match("ESPRESSO 2 x 7,50 15,00"));
    }

    #[test]
    fn test_invalid_merchant_pattern() {
        assert!(merchant_regex(&["kaufland", "(unclosed"]).is_err());
    }

    #[test]
    fn test_summary_line() {
        assert!(SUMMARY_LINE.is_match("TOTAL 15,00"));
        assert!(SUMMARY_LINE.is_match("Subtotal 12.00"));
        assert!(SUMMARY_LINE.is_match("SUMA: 3,00"));
        assert!(!SUMMARY_LINE.is_match("TOTALLY NUTS 3,00"));
        assert!(!SUMMARY_LINE.is_match("ESPRESSO 7,50"));
    }
}
