//! Store name extraction.

use regex::Regex;

use super::patterns::{merchant_regex, MERCHANT};
use super::ExtractionRule;

/// First line containing a known merchant or legal-entity token.
///
/// With no merchant patterns the rule never matches.
pub struct MerchantLineRule {
    pattern: Option<Regex>,
    max_len: usize,
}

impl MerchantLineRule {
    /// Rule using the built-in merchant list.
    pub fn new(max_len: usize) -> Self {
        Self {
            pattern: Some(MERCHANT.clone()),
            max_len,
        }
    }

    /// Rule using custom merchant patterns.
    pub fn with_patterns<S: AsRef<str>>(
        patterns: &[S],
        max_len: usize,
    ) -> Result<Self, regex::Error> {
        let pattern = if patterns.iter().any(|p| !p.as_ref().is_empty()) {
            Some(merchant_regex(patterns)?)
        } else {
            None
        };

        Ok(Self { pattern, max_len })
    }
}

impl ExtractionRule<String> for MerchantLineRule {
    fn name(&self) -> &'static str {
        "merchant_line"
    }

    fn apply(&self, text: &str) -> Option<String> {
        let pattern = self.pattern.as_ref()?;

        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .find(|l| pattern.is_match(l))
            .map(|l| l.chars().take(self.max_len).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_matching_line() {
        let rule = MerchantLineRule::new(60);
        let text = "\n  NR. 0042\n  Lidl Discount SRL  \nKAUFLAND\n";

        assert_eq!(rule.apply(text), Some("Lidl Discount SRL".to_string()));
    }

    #[test]
    fn test_truncates_long_names() {
        let rule = MerchantLineRule::new(10);
        assert_eq!(
            rule.apply("CARREFOUR ROMANIA BANEASA"),
            Some("CARREFOUR ".to_string())
        );
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let rule = MerchantLineRule::new(4);
        assert_eq!(rule.apply("Penny ăîș"), Some("Penn".to_string()));

        let rule = MerchantLineRule::new(7);
        assert_eq!(rule.apply("Penny ăîș"), Some("Penny ă".to_string()));
    }

    #[test]
    fn test_no_known_merchant() {
        let rule = MerchantLineRule::new(60);
        assert_eq!(rule.apply("ESPRESSO 2 x 7,50 15,00\nTOTAL 15,00"), None);
    }

    #[test]
    fn test_custom_patterns() {
        let rule = MerchantLineRule::with_patterns(&["mega image", "auchan"], 60).unwrap();

        assert_eq!(
            rule.apply("bon\nAUCHAN TITAN\n"),
            Some("AUCHAN TITAN".to_string())
        );
        assert_eq!(rule.apply("KAUFLAND"), None);
    }

    #[test]
    fn test_empty_pattern_list_never_matches() {
        let text = "BON FISCAL NR 12\nESPRESSO 7,50";

        let none: &[&str] = &[];
        let rule = MerchantLineRule::with_patterns(none, 60).unwrap();
        assert_eq!(rule.apply(text), None);

        let rule = MerchantLineRule::with_patterns(&["", ""], 60).unwrap();
        assert_eq!(rule.apply(text), None);
    }
}
