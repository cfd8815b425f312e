//! Date normalization for the date comparison strategy.
//!
//! Values are reduced to a calendar date (time of day dropped). Anything that
//! does not parse collapses to [`UNPARSEABLE_DATE`], so two malformed values
//! compare equal to each other and unequal to every real date. Two *different*
//! malformed values also compare equal; that is a known approximation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::model::{format_number, Value};

/// Sentinel every unparseable or missing date normalizes to.
pub const UNPARSEABLE_DATE: NaiveDate = NaiveDate::MIN;

/// Year-first layouts; never ambiguous.
const YEAR_FIRST: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];

const DAY_FIRST: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y", "%d-%m-%y", "%d.%m.%y",
];

const MONTH_FIRST: &[&str] = &[
    "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y", "%m/%d/%y", "%m-%d-%y", "%m.%d.%y",
];

/// Layouts with a spelled-out month.
const NAMED_MONTH: &[&str] = &["%d %b %Y", "%d %B %Y", "%b %d %Y", "%B %d %Y", "%d-%b-%Y", "%d-%b-%y"];

const TIME_SUFFIXES: &[&str] = &[" %H:%M:%S%.f", " %H:%M:%S", " %H:%M", "T%H:%M:%S%.f", "T%H:%M:%S", "T%H:%M"];

/// Parse a date string. `day_first` decides how `01/02/2024` is read; a layout
/// that is impossible in the preferred order (month 13) falls back to the other.
pub fn parse_date(raw: &str, day_first: bool) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    let (preferred, fallback) = if day_first {
        (DAY_FIRST, MONTH_FIRST)
    } else {
        (MONTH_FIRST, DAY_FIRST)
    };

    // Dates with a time component ("2024-01-31 13:45:00")
    for layouts in [YEAR_FIRST, preferred, fallback] {
        for layout in layouts {
            for suffix in TIME_SUFFIXES {
                let full = format!("{layout}{suffix}");
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, &full) {
                    return Some(dt.date());
                }
            }
        }
    }

    YEAR_FIRST
        .iter()
        .chain(preferred)
        .chain(fallback)
        .chain(NAMED_MONTH)
        .find_map(|layout| NaiveDate::parse_from_str(s, layout).ok())
}

/// Normalize any cell to a date, using the sentinel for nulls and anything
/// that does not parse.
///
/// The loader reads `20240101` as a number, so integral numbers are parsed
/// from their rendered digits.
pub fn normalize_date(value: &Value, day_first: bool) -> NaiveDate {
    match value {
        Value::Date(d) => *d,
        Value::Text(s) => parse_date(s, day_first).unwrap_or(UNPARSEABLE_DATE),
        Value::Number(n) if n.fract() == 0.0 => {
            parse_date(&format_number(*n), day_first).unwrap_or(UNPARSEABLE_DATE)
        }
        Value::Null | Value::Number(_) => UNPARSEABLE_DATE,
    }
}
