use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ReconError;
use crate::mapping::ValueMappings;
use crate::model::FieldCategory;

pub const DEFAULT_TOLERANCE: f64 = 0.0001;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    pub old: SourceConfig,
    pub new: SourceConfig,
    pub comparison: ComparisonOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: String,
    #[serde(default)]
    pub delimiter: DelimiterChoice,
    /// Name used in log lines; defaults to the file name.
    #[serde(default)]
    pub label: Option<String>,
}

impl SourceConfig {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.file)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterChoice {
    Comma,
    Tab,
    #[default]
    Auto,
}

impl DelimiterChoice {
    /// `None` means sniff from content.
    pub fn byte(&self) -> Option<u8> {
        match self {
            Self::Comma => Some(b','),
            Self::Tab => Some(b'\t'),
            Self::Auto => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonOptions {
    pub primary_key: String,
    /// Dropped from the old dataset before any check runs.
    #[serde(default)]
    pub exclude_old_columns: Vec<String>,
    #[serde(default)]
    pub date_fields: Vec<String>,
    #[serde(default)]
    pub day_first: bool,
    #[serde(default)]
    pub tolerance: ToleranceSpec,
    /// Per-column strategy override; wins over `date_fields` and type inference.
    #[serde(default)]
    pub field_categories: IndexMap<String, FieldCategory>,
    /// Applied to the old dataset, in declaration order, before the identity check.
    #[serde(default)]
    pub value_mappings: ValueMappings,
    /// Where to persist the audit log once content comparison is done.
    #[serde(skip)]
    pub out_file: Option<PathBuf>,
}

impl ComparisonOptions {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            exclude_old_columns: Vec::new(),
            date_fields: Vec::new(),
            day_first: false,
            tolerance: ToleranceSpec::default(),
            field_categories: IndexMap::new(),
            value_mappings: ValueMappings::new(),
            out_file: None,
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.primary_key.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "primary_key must not be empty".into(),
            ));
        }

        if self.exclude_old_columns.contains(&self.primary_key) {
            return Err(ReconError::ConfigValidation(format!(
                "primary key '{}' cannot be excluded from the old dataset",
                self.primary_key
            )));
        }

        for (column, category) in &self.field_categories {
            if *category != FieldCategory::Date && self.date_fields.contains(column) {
                return Err(ReconError::ConfigValidation(format!(
                    "column '{column}' is listed in date_fields but overridden as {category}"
                )));
            }
        }

        self.tolerance.validate()
    }
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Allowed absolute difference for numeric columns.
///
/// TOML accepts either `tolerance = 0.01` or a table with a required `default`
/// plus per-column entries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawTolerance")]
pub enum ToleranceSpec {
    Uniform(f64),
    PerColumn {
        default: f64,
        columns: IndexMap<String, f64>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTolerance {
    Scalar(f64),
    Table(IndexMap<String, f64>),
}

impl TryFrom<RawTolerance> for ToleranceSpec {
    type Error = String;

    fn try_from(raw: RawTolerance) -> Result<Self, Self::Error> {
        match raw {
            RawTolerance::Scalar(t) => Ok(Self::Uniform(t)),
            RawTolerance::Table(mut columns) => {
                let default = columns
                    .shift_remove("default")
                    .ok_or_else(|| "tolerance table requires a `default` entry".to_string())?;
                Ok(Self::PerColumn { default, columns })
            }
        }
    }
}

impl Default for ToleranceSpec {
    fn default() -> Self {
        Self::Uniform(DEFAULT_TOLERANCE)
    }
}

impl ToleranceSpec {
    pub fn per_column<I, S>(default: f64, columns: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::PerColumn {
            default,
            columns: columns.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Explicit entry for `column`, else the default.
    pub fn for_column(&self, column: &str) -> f64 {
        match self {
            Self::Uniform(t) => *t,
            Self::PerColumn { default, columns } => columns.get(column).copied().unwrap_or(*default),
        }
    }

    fn validate(&self) -> Result<(), ReconError> {
        // Matching is `abs(old - new) < tolerance`, so zero would fail every row.
        let check = |name: &str, t: f64| {
            if t.is_finite() && t > 0.0 {
                Ok(())
            } else {
                Err(ReconError::ConfigValidation(format!(
                    "tolerance for {name} must be a finite, positive number, got {t}"
                )))
            }
        };
        match self {
            Self::Uniform(t) => check("all columns", *t),
            Self::PerColumn { default, columns } => {
                check("default", *default)?;
                for (column, t) in columns {
                    check(&format!("'{column}'"), *t)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ToleranceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform(t) => write!(f, "{t}"),
            Self::PerColumn { default, columns } => {
                write!(f, "default={default}")?;
                for (column, t) in columns {
                    write!(f, ", {column}={t}")?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Audit log file.
    #[serde(default)]
    pub log: Option<String>,
    /// Joined dataset CSV.
    #[serde(default)]
    pub joined: Option<String>,
    /// JSON report.
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.old.file.trim().is_empty() || self.new.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "both [old] and [new] need a file".into(),
            ));
        }
        self.comparison.validate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
