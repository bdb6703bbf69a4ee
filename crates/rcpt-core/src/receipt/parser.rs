//! Rule-based receipt parser.

use std::time::Instant;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, info, trace};

use crate::categorize::CategoryTable;
use crate::error::RcptError;
use crate::models::config::RcptConfig;
use crate::models::receipt::{LineItem, ParsedReceipt};

use super::rules::{
    patterns::SUMMARY_LINE, IsoDateTimeRule, ItemCandidate, LabeledTotalRule, MerchantLineRule,
    NamePriceRule, QtyTimesPriceRule, RuleChain,
};
use super::ReceiptParser;

const DEFAULT_MAX_STORE_NAME_LEN: usize = 60;

/// Receipt parser driven by ordered rule chains.
pub struct RuleBasedParser {
    store_name: RuleChain<String>,
    total: RuleChain<Decimal>,
    purchase_datetime: RuleChain<NaiveDateTime>,
    line_item: RuleChain<ItemCandidate>,
    categories: CategoryTable,
}

impl RuleBasedParser {
    /// Create a parser with the built-in rules and category table.
    pub fn new() -> Self {
        Self {
            store_name: RuleChain::new().then(MerchantLineRule::new(DEFAULT_MAX_STORE_NAME_LEN)),
            total: RuleChain::new().then(LabeledTotalRule::new()),
            purchase_datetime: RuleChain::new().then(IsoDateTimeRule::new()),
            line_item: RuleChain::new()
                .then(QtyTimesPriceRule::new())
                .then(NamePriceRule::new()),
            categories: CategoryTable::default(),
        }
    }

    /// Create a parser from configuration.
    pub fn from_config(config: &RcptConfig) -> Result<Self, RcptError> {
        let merchant = MerchantLineRule::with_patterns(
            &config.parser.merchant_patterns,
            config.parser.max_store_name_len,
        )
        .map_err(|e| RcptError::Config(format!("invalid merchant pattern: {}", e)))?;

        Ok(Self::new()
            .with_store_rules(RuleChain::new().then(merchant))
            .with_categories(CategoryTable::new(config.categories.clone())))
    }

    /// Replace the store name rules.
    pub fn with_store_rules(mut self, rules: RuleChain<String>) -> Self {
        self.store_name = rules;
        self
    }

    /// Replace the total amount rules.
    pub fn with_total_rules(mut self, rules: RuleChain<Decimal>) -> Self {
        self.total = rules;
        self
    }

    /// Replace the purchase date rules.
    pub fn with_datetime_rules(mut self, rules: RuleChain<NaiveDateTime>) -> Self {
        self.purchase_datetime = rules;
        self
    }

    /// Replace the per-line item rules.
    pub fn with_item_rules(mut self, rules: RuleChain<ItemCandidate>) -> Self {
        self.line_item = rules;
        self
    }

    /// Set the category table.
    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    fn extract_line_items(&self, lines: &[&str]) -> Vec<LineItem> {
        let mut items = Vec::new();
        let mut rejected = 0usize;

        for line in lines {
            if SUMMARY_LINE.is_match(line) {
                trace!("Skipping summary line {:?}", line);
                continue;
            }

            let Some(candidate) = self.line_item.first_match(line) else {
                continue;
            };

            if !candidate.is_acceptable() {
                trace!("Rejected item candidate {:?}", candidate);
                rejected += 1;
                continue;
            }

            let category = self.categories.categorize(&candidate.name);
            items.push(LineItem {
                line_no: items.len() as u32 + 1,
                product_name: candidate.name,
                qty: candidate.qty,
                unit_price: candidate.unit_price,
                total_price: candidate.total_price,
                category,
            });
        }

        debug!("Accepted {} items, rejected {}", items.len(), rejected);
        items
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptParser for RuleBasedParser {
    fn parse(&self, text: &str) -> ParsedReceipt {
        let start = Instant::now();

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        info!(
            "Parsing receipt from {} characters ({} lines)",
            text.len(),
            lines.len()
        );

        let receipt = ParsedReceipt {
            store_name: self.store_name.first_match(text),
            total_amount: self.total.first_match(text),
            purchase_datetime: self.purchase_datetime.first_match(text),
            items: self.extract_line_items(&lines),
        };

        debug!(
            "Parsed receipt in {}us: store={:?} total={:?} datetime={:?}",
            start.elapsed().as_micros(),
            receipt.store_name,
            receipt.total_amount,
            receipt.purchase_datetime
        );

        receipt
    }
}
