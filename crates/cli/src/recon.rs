//! `parity run`, `parity validate` and `parity keys`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use parity_recon::config::DelimiterChoice;
use parity_recon::identity::{duplicate_keys, key_is_unique};
use parity_recon::model::{ReconInput, ReconResult};
use parity_recon::{AuditLog, ReconConfig, RunStatus};

use crate::exit_codes::{EXIT_DIFFERENCES, EXIT_IDENTITY, EXIT_INPUT, EXIT_INVALID_CONFIG, EXIT_OUTPUT, EXIT_USAGE};
use crate::input::{load_file, load_source, resolve};
use crate::CliError;

/// Duplicate keys listed by `parity keys` before truncating.
const MAX_LISTED_DUPLICATES: usize = 10;

pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub joined: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::new(EXIT_USAGE, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))
}

fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = read_config(&args.config)?;
    let base_dir = config_dir(&args.config);

    // CLI flags win; config outputs resolve against the config directory
    let from_config = |p: &Option<String>| p.as_deref().map(|f| resolve(base_dir, f));
    let json_path = args.output.or_else(|| from_config(&config.output.json));
    let joined_path = args.joined.or_else(|| from_config(&config.output.joined));
    let log_path = args.log_file.or_else(|| from_config(&config.output.log));

    let mut log = AuditLog::new();
    let input = ReconInput {
        old: load_source(base_dir, &config.old, &mut log)?,
        new: load_source(base_dir, &config.new, &mut log)?,
    };

    let result = parity_recon::run(&config, input, &mut log)
        .map_err(|e| CliError::new(EXIT_INPUT, e.to_string()))?;

    if let Some(path) = &log_path {
        log.store(path).map_err(|e| output_err(path, e))?;
    }

    if let Some(path) = &joined_path {
        if let Some(joined) = &result.joined {
            let file = File::create(path).map_err(|e| output_err(path, e))?;
            joined.write_csv(BufWriter::new(file)).map_err(|e| output_err(path, e))?;
        }
    }

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::new(EXIT_OUTPUT, format!("JSON serialization error: {e}")))?;

    if let Some(path) = &json_path {
        std::fs::write(path, &json_str).map_err(|e| output_err(path, e))?;
        tracing::debug!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(&result);

    match result.status {
        RunStatus::Aborted => Err(CliError::new(EXIT_IDENTITY, "primary key checks failed; comparison aborted")
            .with_hint(format!(
                "run `parity keys <file> --key {}` on each input",
                config.comparison.primary_key
            ))),
        RunStatus::Done if result.has_differences() => {
            Err(CliError::new(EXIT_DIFFERENCES, "differences found"))
        }
        RunStatus::Done => Ok(()),
    }
}

fn output_err(path: &Path, e: impl std::fmt::Display) -> CliError {
    CliError::new(EXIT_OUTPUT, format!("cannot write {}: {e}", path.display()))
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    eprintln!(
        "{}: {} on '{}'",
        result.meta.config_name, result.status, result.meta.primary_key
    );

    if let Some(m) = &result.membership {
        eprintln!(
            "  rows:    {} shared, {} old-only ({}%), {} new-only ({}%)",
            m.shared,
            m.old_only.len(),
            m.old_only_pct,
            m.new_only.len(),
            m.new_only_pct,
        );
    }

    if let Some(s) = &result.structure {
        eprintln!(
            "  columns: {} shared, {} old-only, {} new-only",
            s.shared.len(),
            s.old_only.len(),
            s.new_only.len(),
        );
    }

    if let Some(c) = &result.content {
        eprintln!(
            "  content: {} joined rows, {} columns, {} info, {} warning, {} error",
            c.joined_rows,
            c.columns.len(),
            c.issues.info,
            c.issues.warning,
            c.issues.error,
        );
        for col in c.columns.iter().filter(|col| col.severity.is_some()) {
            let severity = col.severity.map(|s| s.to_string()).unwrap_or_default();
            eprintln!(
                "    {:<24} {:<8} {:>8.4}  {}",
                col.column,
                col.category.to_string(),
                col.match_rate,
                severity
            );
        }
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: '{}' compares {} with {} on '{}'",
        config.name,
        config.old.label(),
        config.new.label(),
        config.comparison.primary_key,
    );
    Ok(())
}

pub fn cmd_keys(file: PathBuf, key: String, delimiter: DelimiterChoice) -> Result<(), CliError> {
    let mut log = AuditLog::new();
    let label = file.display().to_string();
    let dataset = load_file(&file, &label, delimiter, &mut log)?;

    if !dataset.has_column(&key) {
        return Err(CliError::new(EXIT_IDENTITY, format!("{label}: no column '{key}'"))
            .with_hint(format!("columns: {}", dataset.column_names().collect::<Vec<_>>().join(", "))));
    }

    if key_is_unique(&dataset, &key) {
        eprintln!("{label}: {} rows, '{key}' is unique", dataset.row_count());
        return Ok(());
    }

    let duplicates = duplicate_keys(&dataset, &key);
    eprintln!(
        "{label}: {} rows, {} duplicated value(s) of '{key}'",
        dataset.row_count(),
        duplicates.len()
    );
    for (value, count) in duplicates.iter().take(MAX_LISTED_DUPLICATES) {
        eprintln!("  {value}  x{count}");
    }
    if duplicates.len() > MAX_LISTED_DUPLICATES {
        eprintln!("  ... and {} more", duplicates.len() - MAX_LISTED_DUPLICATES);
    }

    Err(CliError::new(EXIT_IDENTITY, format!("'{key}' is not unique in {label}")))
}
