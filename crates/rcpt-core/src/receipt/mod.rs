//! Receipt field extraction module.

mod parser;
pub mod rules;

pub use parser::RuleBasedParser;

use crate::models::receipt::ParsedReceipt;

/// Trait for receipt parsing.
///
/// Parsing never fails: a field that cannot be found is left empty and the
/// remaining fields are still extracted.
pub trait ReceiptParser {
    /// Parse receipt fields and line items from plain text.
    fn parse(&self, text: &str) -> ParsedReceipt;
}
