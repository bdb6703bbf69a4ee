//! Purchase date extraction.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use super::patterns::PURCHASE_DATETIME;
use super::ExtractionRule;

/// `YYYY-MM-DD` (or `.`/`/` separated) with an optional `HH:MM`.
///
/// The first match forming a real calendar date wins. A missing or invalid
/// time means midnight.
pub struct IsoDateTimeRule {
    pattern: Regex,
}

impl IsoDateTimeRule {
    pub fn new() -> Self {
        Self {
            pattern: PURCHASE_DATETIME.clone(),
        }
    }
}

impl Default for IsoDateTimeRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule<NaiveDateTime> for IsoDateTimeRule {
    fn name(&self) -> &'static str {
        "iso_datetime"
    }

    fn apply(&self, text: &str) -> Option<NaiveDateTime> {
        self.pattern.captures_iter(text).find_map(|caps| {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let day: u32 = caps[3].parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?;

            let time = match (caps.get(4), caps.get(5)) {
                (Some(h), Some(m)) => {
                    let hour: u32 = h.as_str().parse().ok()?;
                    let minute: u32 = m.as_str().parse().ok()?;
                    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
                }
                _ => NaiveTime::MIN,
            };

            Some(date.and_time(time))
        })
    }
}
