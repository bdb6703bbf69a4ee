//! Line item extraction.

use regex::Regex;
use rust_decimal::Decimal;

use super::amounts::parse_amount;
use super::patterns::{ITEM_NAME_PRICE, ITEM_QTY_PRICE};
use super::ExtractionRule;

/// A product line recognized on a receipt, before acceptance checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemCandidate {
    pub name: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl ItemCandidate {
    /// Check if the candidate can become a line item.
    pub fn is_acceptable(&self) -> bool {
        !self.name.is_empty() && self.total_price > Decimal::ZERO && self.qty > Decimal::ZERO
    }
}

/// `<name> <qty> x <unit price> <total price>`.
pub struct QtyTimesPriceRule {
    pattern: Regex,
}

impl QtyTimesPriceRule {
    pub fn new() -> Self {
        Self {
            pattern: ITEM_QTY_PRICE.clone(),
        }
    }
}

impl Default for QtyTimesPriceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule<ItemCandidate> for QtyTimesPriceRule {
    fn name(&self) -> &'static str {
        "qty_times_price"
    }

    fn apply(&self, line: &str) -> Option<ItemCandidate> {
        let caps = self.pattern.captures(line)?;

        Some(ItemCandidate {
            name: caps[1].trim().to_string(),
            qty: parse_amount(&caps[2])?,
            unit_price: parse_amount(&caps[3])?,
            total_price: parse_amount(&caps[4])?,
        })
    }
}

/// `<name> <total price>`, read as a single unit.
pub struct NamePriceRule {
    pattern: Regex,
}

impl NamePriceRule {
    pub fn new() -> Self {
        Self {
            pattern: ITEM_NAME_PRICE.clone(),
        }
    }
}

impl Default for NamePriceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule<ItemCandidate> for NamePriceRule {
    fn name(&self) -> &'static str {
        "name_price"
    }

    fn apply(&self, line: &str) -> Option<ItemCandidate> {
        let caps = self.pattern.captures(line)?;
        let total = parse_amount(&caps[2])?;

        Some(ItemCandidate {
            name: caps[1].trim().to_string(),
            qty: Decimal::ONE,
            unit_price: total,
            total_price: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_qty_times_price() {
        let rule = QtyTimesPriceRule::new();

        assert_eq!(
            rule.apply("ESPRESSO 2 x 7,50 15,00"),
            Some(ItemCandidate {
                name: "ESPRESSO".to_string(),
                qty: dec("2"),
                unit_price: dec("7.50"),
                total_price: dec("15.00"),
            })
        );
    }

    #[test]
    fn test_fractional_qty_and_multiplication_sign() {
        let rule = QtyTimesPriceRule::new();
        let item = rule.apply("BANANE 1,250 × 6.00 7.50").unwrap();

        assert_eq!(item.name, "BANANE");
        assert_eq!(item.qty, dec("1.250"));
        assert_eq!(item.total_price, dec("7.50"));

        let item = rule.apply("MERE 0.5X4,00 2,00").unwrap();
        assert_eq!(item.qty, dec("0.5"));
    }

    #[test]
    fn test_name_price() {
        let rule = NamePriceRule::new();

        assert_eq!(
            rule.apply("CROISSANT 6,50"),
            Some(ItemCandidate {
                name: "CROISSANT".to_string(),
                qty: Decimal::ONE,
                unit_price: dec("6.50"),
                total_price: dec("6.50"),
            })
        );
        assert_eq!(rule.apply("CROISSANT"), None);
        assert_eq!(rule.apply("2024-05-01 10:00"), None);
    }

    #[test]
    fn test_acceptance() {
        let rule = NamePriceRule::new();

        assert!(!rule.apply("FREE SAMPLE 0,00").unwrap().is_acceptable());
        assert!(rule.apply("APA PLATA 5,00").unwrap().is_acceptable());

        let zero_qty = QtyTimesPriceRule::new()
            .apply("ESPRESSO 0 x 7,50 15,00")
            .unwrap();
        assert!(!zero_qty.is_acceptable());
    }
}
