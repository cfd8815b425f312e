//! Field-by-field comparison of the rows both datasets share.
//!
//! Rows are aligned by an inner join on the primary key. Each shared column gets
//! one [`FieldCategory`] before the row loop starts, and its per-row match vector
//! is kept under the column's own name in [`JoinedDataset::diffs`].

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::audit::AuditLog;
use crate::config::ComparisonOptions;
use crate::dates::normalize_date;
use crate::error::{ReconError, Result};
use crate::model::{
    join_keys, Column, ColumnReport, ContentReport, Dataset, FieldCategory, IssueTally, JoinedDataset,
    KeyValue, Severity, Value,
};

/// Token a missing value compares as under the exact strategy.
pub const MISSING_TOKEN: &str = "NA";

#[derive(Debug, Clone)]
pub struct ContentComparison {
    pub joined: JoinedDataset,
    pub report: ContentReport,
}

/// Compare the content of every shared non-key column over the joined rows.
///
/// Rows whose key exists on one side only are not compared here. A missing
/// primary key is the only error; everything else degrades to log entries.
pub fn compare_content(
    old: &Dataset,
    new: &Dataset,
    options: &ComparisonOptions,
    log: &mut AuditLog,
) -> Result<ContentComparison> {
    log.debug("Comparing content", true);

    let pkey = options.primary_key.as_str();
    let (keys, old_rows, new_rows) = inner_join(old, new, pkey)?;

    let shared: Vec<&str> = old
        .column_names()
        .filter(|c| *c != pkey && new.has_column(c))
        .collect();

    let old_aligned = take_rows(old, &shared, &old_rows)?;
    let new_aligned = take_rows(new, &shared, &new_rows)?;

    let mut diffs = IndexMap::new();
    let mut columns = Vec::with_capacity(shared.len());
    let mut issues = IssueTally::default();

    for (old_col, new_col) in old_aligned.columns().iter().zip(new_aligned.columns()) {
        let name = old_col.name.as_str();
        let category = select_category(name, &old_col.values, &new_col.values, options, log);

        let (matches, tolerance) = match category {
            FieldCategory::Date => (compare_dates(&old_col.values, &new_col.values, options.day_first), None),
            FieldCategory::Numeric => {
                let tolerance = options.tolerance.for_column(name);
                (compare_numbers(&old_col.values, &new_col.values, tolerance), Some(tolerance))
            }
            FieldCategory::Exact => (compare_exact(&old_col.values, &new_col.values), None),
        };

        let matched_rows = matches.iter().filter(|m| **m).count();
        let match_rate = match_rate(matched_rows, matches.len());
        let severity = Severity::from_match_rate(match_rate);

        if let Some(severity) = severity {
            let message = format!("Column {name} match rate: {match_rate}");
            match severity {
                Severity::Info => log.debug(message, false),
                Severity::Warning => log.warning(message),
                Severity::Error => log.error(message),
            }
            issues.record(severity);
        }

        columns.push(ColumnReport {
            column: name.to_string(),
            category,
            tolerance,
            compared_rows: matches.len(),
            matched_rows,
            match_rate,
            severity,
        });
        diffs.insert(name.to_string(), matches);
    }

    if issues.total() == 0 {
        log.debug("Content matches exactly", false);
    }

    let joined_rows = keys.len();
    Ok(ContentComparison {
        joined: JoinedDataset {
            pkey: pkey.to_string(),
            keys,
            old: old_aligned,
            new: new_aligned,
            diffs,
        },
        report: ContentReport {
            joined_rows,
            columns,
            issues,
        },
    })
}

/// Pick the strategy for one column: explicit override, then the date list,
/// then numeric when every aligned value on both sides is a number or null.
pub fn select_category(
    column: &str,
    old: &[Value],
    new: &[Value],
    options: &ComparisonOptions,
    log: &mut AuditLog,
) -> FieldCategory {
    let all_numeric = || old.iter().chain(new).all(Value::is_numeric_or_null);

    match options.field_categories.get(column) {
        Some(FieldCategory::Numeric) if !all_numeric() => {
            log.warning(format!(
                "Column {column} is configured as numeric but holds non-numeric values; comparing exactly"
            ));
            FieldCategory::Exact
        }
        Some(category) => *category,
        None if options.date_fields.iter().any(|d| d == column) => FieldCategory::Date,
        None if all_numeric() => FieldCategory::Numeric,
        None => FieldCategory::Exact,
    }
}

/// Dates match when their normalized calendar dates are equal.
pub fn compare_dates(old: &[Value], new: &[Value], day_first: bool) -> Vec<bool> {
    old.iter()
        .zip(new)
        .map(|(o, n)| normalize_date(o, day_first) == normalize_date(n, day_first))
        .collect()
}

/// `abs(old - new) < tolerance`, strictly.
///
/// Missing values count as zero on both sides, so a null facing a real 0 is a
/// match: a value missing on one side and zero on the other is not reported.
pub fn compare_numbers(old: &[Value], new: &[Value], tolerance: f64) -> Vec<bool> {
    old.iter()
        .zip(new)
        .map(|(o, n)| within_tolerance(o.as_f64().unwrap_or(0.0), n.as_f64().unwrap_or(0.0), tolerance))
        .collect()
}

/// Strict tolerance test on decimal input. `10.1 - 10.0` is `0.0999...96` in
/// f64, so the difference is padded by the rounding error of its operands:
/// a difference equal to the tolerance in decimal is never a match.
pub fn within_tolerance(old: f64, new: f64, tolerance: f64) -> bool {
    let diff = (old - new).abs();
    if diff == 0.0 {
        return true;
    }
    let rounding = 4.0 * f64::EPSILON * old.abs().max(new.abs());
    diff + rounding < tolerance
}

/// Literal equality of rendered values, with nulls rendered as [`MISSING_TOKEN`].
pub fn compare_exact(old: &[Value], new: &[Value]) -> Vec<bool> {
    old.iter()
        .zip(new)
        .map(|(o, n)| exact_token(o) == exact_token(n))
        .collect()
}

fn exact_token(value: &Value) -> String {
    if value.is_null() {
        MISSING_TOKEN.to_string()
    } else {
        value.literal()
    }
}

/// Mean of the match vector. An empty join has nothing to disagree on.
fn match_rate(matched: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        matched as f64 / total as f64
    }
}

/// Inner join on `pkey`, in old's row order, over [`join_keys`]. Returns the key of each joined row
/// plus the source row index on each side. A key repeated on either side
/// multiplies rows, which is why identity validation must run first.
fn inner_join(old: &Dataset, new: &Dataset, pkey: &str) -> Result<(Vec<KeyValue>, Vec<usize>, Vec<usize>)> {
    let (old_keys, new_keys) = join_keys(key_column(old, pkey, "old")?, key_column(new, pkey, "new")?);

    let mut new_index: HashMap<&KeyValue, Vec<usize>> = HashMap::new();
    for (i, key) in new_keys.iter().enumerate() {
        new_index.entry(key).or_default().push(i);
    }

    let mut keys = Vec::new();
    let mut old_rows = Vec::new();
    let mut new_rows = Vec::new();
    for (i, key) in old_keys.iter().enumerate() {
        if let Some(matches) = new_index.get(key) {
            for &j in matches {
                keys.push(key.clone());
                old_rows.push(i);
                new_rows.push(j);
            }
        }
    }

    Ok((keys, old_rows, new_rows))
}

fn key_column<'a>(dataset: &'a Dataset, pkey: &str, side: &str) -> Result<&'a Column> {
    dataset.column(pkey).ok_or_else(|| ReconError::MissingColumn {
        dataset: side.into(),
        column: pkey.into(),
    })
}

fn take_rows(dataset: &Dataset, columns: &[&str], rows: &[usize]) -> Result<Dataset> {
    let picked: Vec<Column> = columns
        .iter()
        .filter_map(|name| dataset.column(name))
        .map(|col| {
            let values = rows.iter().map(|&r| col.values[r].clone()).collect();
            Column::new(col.name.clone(), values)
        })
        .collect();
    Dataset::new(picked)
}
