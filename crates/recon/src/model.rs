use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::audit::LogEntry;
use crate::error::{ReconError, Result};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single cell. Strings arrive trimmed from the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric_or_null(&self) -> bool {
        matches!(self, Self::Null | Self::Number(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Literal rendering used by exact comparison, value mapping and CSV export.
    /// Null renders as the empty string.
    pub fn literal(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Hashable identity of this value for primary-key work.
    pub fn key(&self) -> KeyValue {
        match self {
            Self::Null => KeyValue::Null,
            Self::Number(n) => KeyValue::Number(OrderedFloat(*n)),
            Self::Text(s) => KeyValue::Text(s.clone()),
            Self::Date(d) => KeyValue::Date(*d),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            other => write!(f, "{}", other.literal()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        }
    }
}

/// Mapping targets in TOML are plain scalars: strings, integers or floats.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match Scalar::deserialize(deserializer)? {
            Scalar::Int(n) => Value::Number(n as f64),
            Scalar::Float(n) => Value::Number(n),
            Scalar::Text(s) => Value::Text(s),
        })
    }
}

pub(crate) fn format_number(n: f64) -> String {
    // -0.0 and 0.0 must render identically
    if n == 0.0 {
        return "0".to_string();
    }
    n.to_string()
}

/// Hashable, totally ordered projection of a [`Value`].
///
/// Numbers compare through `OrderedFloat`, so `-0.0 == 0.0` and NaN equals itself.
/// A numeric `1` and the text `"1"` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Null,
    Number(OrderedFloat<f64>),
    Text(String),
    Date(NaiveDate),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Number(n) => write!(f, "{}", format_number(n.0)),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of distinct values, with all nulls counted as one.
    pub fn distinct_count(&self) -> usize {
        self.values.iter().map(Value::key).collect::<HashSet<_>>().len()
    }

    /// At least one number and nothing but numbers and nulls.
    pub fn is_numeric(&self) -> bool {
        self.values.iter().any(|v| matches!(v, Value::Number(_)))
            && self.values.iter().all(Value::is_numeric_or_null)
    }

    fn has_text(&self) -> bool {
        self.values.iter().any(|v| !v.is_numeric_or_null())
    }
}

/// True when one key column was read as numbers and the other holds text.
pub fn mixed_key_types(old: &Column, new: &Column) -> bool {
    (old.is_numeric() && new.has_text()) || (old.has_text() && new.is_numeric())
}

/// Keys of two key columns, made comparable with each other. With mixed key
/// types both sides are keyed by their rendered literal, so the number `1001`
/// meets the text `"1001"`. Nulls stay null.
pub fn join_keys(old: &Column, new: &Column) -> (Vec<KeyValue>, Vec<KeyValue>) {
    let keys = |col: &Column, as_text: bool| -> Vec<KeyValue> {
        col.values
            .iter()
            .map(|v| match v {
                Value::Null => KeyValue::Null,
                v if as_text => KeyValue::Text(v.literal()),
                v => v.key(),
            })
            .collect()
    };
    let as_text = mixed_key_types(old, new);
    (keys(old, as_text), keys(new, as_text))
}

/// An ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(ReconError::DuplicateColumn(col.name.clone()));
            }
            if col.len() != row_count {
                return Err(ReconError::RaggedColumn {
                    column: col.name.clone(),
                    expected: row_count,
                    found: col.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Build from row-major data. Every row must have one value per header.
    pub fn from_rows<S: AsRef<str>>(headers: &[S], rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut columns: Vec<Column> = headers
            .iter()
            .map(|h| Column::new(h.as_ref(), Vec::with_capacity(rows.len())))
            .collect();

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ReconError::Csv {
                    label: "rows".into(),
                    message: format!("row {i} has {} values, expected {}", row.len(), columns.len()),
                });
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.values.push(value);
            }
        }

        Self::new(columns)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Remove the named columns; names that don't exist are ignored.
    /// Returns the names actually removed, in dataset order.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut dropped = Vec::new();
        self.columns.retain(|c| {
            let remove = names.iter().any(|n| n.as_ref() == c.name);
            if remove {
                dropped.push(c.name.clone());
            }
            !remove
        });
        if self.columns.is_empty() {
            self.row_count = 0;
        }
        dropped
    }
}

// ---------------------------------------------------------------------------
// Comparison strategy
// ---------------------------------------------------------------------------

/// How a shared column is compared. Chosen once per column, before the row loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Date,
    Numeric,
    Exact,
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date => write!(f, "date"),
            Self::Numeric => write!(f, "numeric"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// Severity band of a column whose match rate is below 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

pub const INFO_THRESHOLD: f64 = 0.98;
pub const WARNING_THRESHOLD: f64 = 0.90;

impl Severity {
    /// `None` for a perfect column.
    pub fn from_match_rate(rate: f64) -> Option<Self> {
        if rate >= 1.0 {
            None
        } else if rate >= INFO_THRESHOLD {
            Some(Self::Info)
        } else if rate >= WARNING_THRESHOLD {
            Some(Self::Warning)
        } else {
            Some(Self::Error)
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipReport {
    pub old_keys: usize,
    pub new_keys: usize,
    pub shared: usize,
    pub old_only: Vec<KeyValue>,
    pub new_only: Vec<KeyValue>,
    /// Percent of old's own keys, rounded to two decimals. 0 for an empty side.
    pub old_only_pct: f64,
    pub new_only_pct: f64,
}

impl MembershipReport {
    /// One issue per side with keys the other side lacks.
    pub fn issues(&self) -> usize {
        usize::from(!self.old_only.is_empty()) + usize::from(!self.new_only.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub shared: Vec<String>,
    pub old_only: Vec<String>,
    pub new_only: Vec<String>,
}

impl StructureReport {
    pub fn identical(&self) -> bool {
        self.old_only.is_empty() && self.new_only.is_empty()
    }

    pub fn issues(&self) -> usize {
        usize::from(!self.old_only.is_empty()) + usize::from(!self.new_only.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReport {
    pub column: String,
    pub category: FieldCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    pub compared_rows: usize,
    pub matched_rows: usize,
    pub match_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueTally {
    pub info: usize,
    pub warning: usize,
    pub error: usize,
}

impl IssueTally {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.error
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentReport {
    pub joined_rows: usize,
    pub columns: Vec<ColumnReport>,
    pub issues: IssueTally,
}

impl ContentReport {
    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.column == name)
    }

    pub fn match_rates(&self) -> IndexMap<String, f64> {
        self.columns
            .iter()
            .map(|c| (c.column.clone(), c.match_rate))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Joined dataset
// ---------------------------------------------------------------------------

/// Inner join of old and new on the primary key, restricted to shared columns.
///
/// Row `i` of `old` and `new` both belong to `keys[i]`. Each compared column keeps
/// its own match vector in `diffs`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedDataset {
    pub pkey: String,
    pub keys: Vec<KeyValue>,
    pub old: Dataset,
    pub new: Dataset,
    pub diffs: IndexMap<String, Vec<bool>>,
}

impl JoinedDataset {
    pub fn row_count(&self) -> usize {
        self.keys.len()
    }

    pub fn diff(&self, column: &str) -> Option<&[bool]> {
        self.diffs.get(column).map(Vec::as_slice)
    }

    /// Keys of rows where `column` did not match.
    pub fn mismatched_keys(&self, column: &str) -> Vec<&KeyValue> {
        self.diff(column)
            .map(|d| {
                d.iter()
                    .zip(&self.keys)
                    .filter(|(ok, _)| !**ok)
                    .map(|(_, k)| k)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write as CSV: key, then `<col>_old`, `<col>_new`, `<col>_match` per compared column.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let csv_err = |e: csv::Error| ReconError::Csv {
            label: "joined".into(),
            message: e.to_string(),
        };

        let mut header = vec![self.pkey.clone()];
        for col in self.diffs.keys() {
            header.push(format!("{col}_old"));
            header.push(format!("{col}_new"));
            header.push(format!("{col}_match"));
        }
        out.write_record(&header).map_err(csv_err)?;

        for (i, key) in self.keys.iter().enumerate() {
            let mut record = vec![key.to_string()];
            for (col, diff) in &self.diffs {
                let old = self.old.get(i, col).map(Value::literal).unwrap_or_default();
                let new = self.new.get(i, col).map(Value::literal).unwrap_or_default();
                record.push(old);
                record.push(new);
                record.push(diff[i].to_string());
            }
            out.write_record(&record).map_err(csv_err)?;
        }

        out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Both datasets of one run, already loaded.
#[derive(Debug, Clone)]
pub struct ReconInput {
    pub old: Dataset,
    pub new: Dataset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Content comparison produced a result.
    Done,
    /// Identity check failed; nothing after it ran.
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub primary_key: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<MembershipReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentReport>,
    pub warning_detected: bool,
    pub error_detected: bool,
    pub log: Vec<LogEntry>,
    #[serde(skip)]
    pub joined: Option<JoinedDataset>,
}

impl ReconResult {
    /// Any logged warning or error, or any content column below a perfect match
    /// rate. Info-band columns are logged at debug level but still count.
    pub fn has_differences(&self) -> bool {
        self.warning_detected
            || self.error_detected
            || self.content.as_ref().is_some_and(|c| c.issues.total() > 0)
    }
}
