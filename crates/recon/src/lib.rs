//! `parity-recon`: old-vs-new dataset reconciliation engine.
//!
//! Validates the primary key, compares key membership and column sets, then
//! scores every shared column over the rows both datasets hold. All findings
//! go to an [`AuditLog`]; nothing short of a broken identity gate stops a run.
//! No CLI dependencies; reading files is the caller's job.

pub mod audit;
pub mod config;
pub mod content;
pub mod dates;
pub mod engine;
pub mod error;
pub mod identity;
pub mod loader;
pub mod mapping;
pub mod membership;
pub mod model;
pub mod structure;

pub use audit::{AuditLog, LogEntry, LogSeverity};
pub use config::{ComparisonOptions, ReconConfig, ToleranceSpec};
pub use content::compare_content;
pub use engine::{run, run_comparison, ComparisonOutcome};
pub use error::ReconError;
pub use identity::validate_identity;
pub use loader::{load_dataset, LoadOptions};
pub use mapping::apply_value_mappings;
pub use membership::compare_membership;
pub use model::{Dataset, FieldCategory, JoinedDataset, ReconInput, ReconResult, RunStatus, Value};
pub use structure::compare_columns;
