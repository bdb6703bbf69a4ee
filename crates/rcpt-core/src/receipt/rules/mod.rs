//! Rule-based field extractors for receipts.
//!
//! Each field is extracted by a [`RuleChain`]: an ordered list of rules that
//! are tried in declared priority until one produces a value.

pub mod amounts;
pub mod dates;
pub mod items;
pub mod patterns;
pub mod store;

pub use amounts::{parse_amount, LabeledTotalRule};
pub use dates::IsoDateTimeRule;
pub use items::{ItemCandidate, NamePriceRule, QtyTimesPriceRule};
pub use store::MerchantLineRule;

use tracing::trace;

/// A single extraction rule.
pub trait ExtractionRule<T>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Try to extract a value from the input.
    fn apply(&self, input: &str) -> Option<T>;
}

/// Ordered list of rules, first success wins.
pub struct RuleChain<T> {
    rules: Vec<Box<dyn ExtractionRule<T>>>,
}

impl<T> RuleChain<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule with the lowest priority so far.
    pub fn then(mut self, rule: impl ExtractionRule<T> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the rules in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run the rules in order and return the first value produced.
    pub fn first_match(&self, input: &str) -> Option<T> {
        self.rules.iter().find_map(|rule| {
            let value = rule.apply(input);
            if value.is_some() {
                trace!("Rule {} matched", rule.name());
            }
            value
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for RuleChain<T> {
    fn default() -> Self {
        Self::new()
    }
}
