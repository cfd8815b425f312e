use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty key, bad tolerance, conflicting categories).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A column the operation requires is absent from a dataset.
    #[error("{dataset} dataset: missing column '{column}'")]
    MissingColumn { dataset: String, column: String },
    /// Columns of a dataset disagree on row count.
    #[error("column '{column}' has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    /// Two columns with the same name in one dataset.
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    /// Malformed delimited input.
    #[error("{label}: {message}")]
    Csv { label: String, message: String },
    /// IO error (audit log persistence, joined export).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReconError>;
