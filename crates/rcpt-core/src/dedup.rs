//! Deduplication fingerprints.
//!
//! A fingerprint is the SHA-256 of `store|datetime|total`, with an empty
//! string standing in for each absent field. Receipts with all three fields
//! absent therefore share one fingerprint; callers that reject duplicates
//! must decide how to treat that case.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator between canonical fields.
pub const FIELD_SEPARATOR: char = '|';

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Hex-encoded SHA-256 digest identifying a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the canonical identity string for a purchase.
pub fn canonical_key(
    store_identity: Option<&str>,
    purchase_datetime: Option<NaiveDateTime>,
    total_amount: Option<Decimal>,
) -> String {
    let store = store_identity.unwrap_or_default();
    let datetime = purchase_datetime
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default();
    // 15.0 and 15.00 are the same total.
    let total = total_amount
        .map(|t| t.normalize().to_string())
        .unwrap_or_default();

    format!(
        "{}{sep}{}{sep}{}",
        store,
        datetime,
        total,
        sep = FIELD_SEPARATOR
    )
}

/// Compute the dedup fingerprint of a purchase.
pub fn fingerprint(
    store_identity: Option<&str>,
    purchase_datetime: Option<NaiveDateTime>,
    total_amount: Option<Decimal>,
) -> DedupKey {
    let key = canonical_key(store_identity, purchase_datetime, total_amount);
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    DedupKey(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn amount(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(
            canonical_key(Some("RO123"), Some(at(10, 0)), Some(amount("15.00"))),
            "RO123|2024-05-01T10:00:00|15"
        );
        assert_eq!(canonical_key(None, None, Some(amount("23.50"))), "||23.5");
        assert_eq!(canonical_key(None, None, None), "||");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint(Some("RO123"), Some(at(10, 0)), Some(amount("15.00")));
        let b = fingerprint(Some("RO123"), Some(at(10, 0)), Some(amount("15.00")));

        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_differs_per_field() {
        let base = fingerprint(Some("RO123"), Some(at(10, 0)), Some(amount("15.00")));

        assert_ne!(base, fingerprint(Some("RO124"), Some(at(10, 0)), Some(amount("15.00"))));
        assert_ne!(base, fingerprint(Some("RO123"), Some(at(10, 1)), Some(amount("15.00"))));
        assert_ne!(base, fingerprint(Some("RO123"), Some(at(10, 0)), Some(amount("15.01"))));
        assert_ne!(base, fingerprint(None, Some(at(10, 0)), Some(amount("15.00"))));
    }

    #[test]
    fn test_equal_totals_with_different_scale() {
        assert_eq!(
            fingerprint(None, None, Some(amount("15.0"))),
            fingerprint(None, None, Some(amount("15.00")))
        );
    }

    #[test]
    fn test_all_absent_fields_collide() {
        assert_eq!(fingerprint(None, None, None), fingerprint(None, None, None));
        assert_eq!(
            fingerprint(None, None, None).as_str(),
            "565d240f5343e625ae579a4d45a770f1f02c6368b5ed4d06da4fbe6f47c28866"
        );
    }
}
