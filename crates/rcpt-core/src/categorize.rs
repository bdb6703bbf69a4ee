//! Keyword-based item categorization.
//!
//! Categories come from an ordered table of `(category, keywords)` rules. The
//! lowercased product name is checked against each rule in turn and the first
//! rule with a keyword contained in the name decides the category. Names that
//! match no rule fall back to [`Category::Other`].

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::models::receipt::{Category, LineItem};

/// One row of the category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    /// Lowercase substrings that select this category.
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Check if any keyword occurs in an already lowercased name.
    fn matches(&self, lowercase_name: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && lowercase_name.contains(k.as_str()))
    }
}

/// Built-in rules, in priority order.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            Category::Coffee,
            &["espresso", "cafea", "latte", "capp", "americano"],
        ),
        CategoryRule::new(Category::Water, &["apa", "water", "plata", "carbog"]),
        CategoryRule::new(Category::Beverages, &["suc", "cola", "fanta", "juice"]),
        CategoryRule::new(
            Category::Snack,
            &["sandwich", "croissant", "patis", "snack"],
        ),
    ]
}

lazy_static! {
    static ref DEFAULT_TABLE: CategoryTable = CategoryTable::default();
}

/// Ordered category table.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
}

impl CategoryTable {
    /// Create a table from rules in priority order.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule {
                category: r.category,
                keywords: r.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { rules }
    }

    /// Append a rule with the lowest priority.
    pub fn with_rule(mut self, rule: CategoryRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Assign a category to a product name.
    pub fn categorize(&self, product_name: &str) -> Category {
        let name = product_name.to_lowercase();

        let category = self
            .rules
            .iter()
            .find(|rule| rule.matches(&name))
            .map(|rule| rule.category)
            .unwrap_or(Category::Other);

        trace!("Categorized {:?} as {}", product_name, category);
        category
    }

    /// Re-assign the category of every item in place.
    pub fn categorize_items(&self, items: &mut [LineItem]) {
        for item in items.iter_mut() {
            item.category = self.categorize(&item.product_name);
        }
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Categorize a product name with the built-in table.
pub fn categorize(product_name: &str) -> Category {
    DEFAULT_TABLE.categorize(product_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    #[test]
    fn test_default_categories() {
        assert_eq!(categorize("ESPRESSO DOPPIO"), Category::Coffee);
        assert_eq!(categorize("APA PLATA 1.5L"), Category::Water);
        assert_eq!(categorize("COCA COLA"), Category::Beverages);
        assert_eq!(categorize("CROISSANT"), Category::Snack);
        assert_eq!(categorize("BATTERIES AA"), Category::Other);
        assert_eq!(categorize("Cappuccino Mare"), Category::Coffee);
    }

    #[test]
    fn test_declared_order_breaks_ties() {
        // Coffee is declared before snack.
        assert_eq!(categorize("LATTE + SNACK BOX"), Category::Coffee);
        // Water is declared before beverages.
        assert_eq!(categorize("APA CU SUC"), Category::Water);
    }

    #[test]
    fn test_empty_name_is_other() {
        assert_eq!(categorize(""), Category::Other);
    }

    #[test]
    fn test_custom_rule_is_appended() {
        let table = CategoryTable::default()
            .with_rule(CategoryRule::new(Category::Snack, &["ciocolata"]));

        assert_eq!(table.categorize("CIOCOLATA NEAGRA"), Category::Snack);
        assert_eq!(table.rules().len(), 5);
    }

    #[test]
    fn test_keywords_are_lowercased() {
        let table = CategoryTable::new(vec![CategoryRule {
            category: Category::Water,
            keywords: vec!["BORSEC".to_string()],
        }]);

        assert_eq!(table.categorize("Borsec 2L"), Category::Water);
        assert_eq!(table.categorize("ESPRESSO"), Category::Other);
    }

    #[test]
    fn test_categorize_items_in_place() {
        let mut items = vec![LineItem {
            line_no: 1,
            product_name: "FANTA 0.5L".to_string(),
            qty: Decimal::ONE,
            unit_price: Decimal::ONE,
            total_price: Decimal::ONE,
            category: Category::Other,
        }];

        CategoryTable::default().categorize_items(&mut items);
        assert_eq!(items[0].category, Category::Beverages);
    }
}
