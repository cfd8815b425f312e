//! Delimited text -> [`Dataset`].
//!
//! The first record is the header. Fields are trimmed, missing-value tokens
//! become [`Value::Null`], and a column whose every non-null cell parses as a
//! finite number is loaded as numeric. Everything else stays text; dates are
//! only interpreted by the comparator.

use crate::audit::AuditLog;
use crate::error::{ReconError, Result};
use crate::model::{Column, Dataset, Value};

/// Cells read as missing.
pub const DEFAULT_NA_VALUES: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null", "None", "#N/A"];

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// `None` sniffs the delimiter from the first lines.
    pub delimiter: Option<u8>,
    pub na_values: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    pub fn with_delimiter(delimiter: Option<u8>) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }
}

/// Parse `text` into a dataset. `label` names the source in log lines and errors.
pub fn load_dataset(label: &str, text: &str, options: &LoadOptions, log: &mut AuditLog) -> Result<Dataset> {
    // Excel exports often carry a BOM
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(text));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let csv_err = |e: csv::Error| ReconError::Csv {
        label: label.to_string(),
        message: e.to_string(),
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        for (cells, field) in raw.iter_mut().zip(record.iter()) {
            let cell = if options.na_values.iter().any(|na| na == field) {
                None
            } else {
                Some(field.to_string())
            };
            cells.push(cell);
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| Column::new(name, infer_values(cells)))
        .collect();
    let dataset = Dataset::new(columns)?;

    log.debug(format!("Read {} rows from {label}", dataset.row_count()), false);
    Ok(dataset)
}

/// Numeric when every present cell is a finite number, else text.
fn infer_values(cells: Vec<Option<String>>) -> Vec<Value> {
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().filter(|n| n.is_finite()).map(Some),
        })
        .collect();

    match numbers {
        Some(numbers) => numbers.into_iter().map(Value::from).collect(),
        None => cells.into_iter().map(|c| c.map(Value::Text).unwrap_or(Value::Null)).collect(),
    }
}

/// Pick the delimiter that splits the first lines into the most, and most
/// consistent, fields. Falls back to comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for &delim in candidates {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&target) = counts.first() else {
            continue;
        };
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count();
        let score = consistent * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}
