//! Amount extraction for receipts.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::TOTAL_LABELED;
use super::ExtractionRule;

/// Parse an amount written with `,` or `.` as the decimal separator.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    Decimal::from_str(&s.trim().replace(',', ".")).ok()
}

/// First amount that directly follows a TOTAL/SUMA label.
///
/// Only the first label in document order is considered, so a subtotal
/// printed above the grand total wins.
pub struct LabeledTotalRule {
    pattern: Regex,
}

impl LabeledTotalRule {
    pub fn new() -> Self {
        Self {
            pattern: TOTAL_LABELED.clone(),
        }
    }
}

impl Default for LabeledTotalRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule<Decimal> for LabeledTotalRule {
    fn name(&self) -> &'static str {
        "labeled_total"
    }

    fn apply(&self, text: &str) -> Option<Decimal> {
        let caps = self.pattern.captures(text)?;
        parse_amount(&caps[1])
    }
}
