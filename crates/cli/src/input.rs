//! Reading dataset files from disk.

use std::io::Read;
use std::path::{Path, PathBuf};

use parity_recon::config::{DelimiterChoice, SourceConfig};
use parity_recon::{load_dataset, AuditLog, Dataset, LoadOptions};

use crate::exit_codes::EXIT_INPUT;
use crate::CliError;

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Resolve `file` against the config directory unless it is absolute.
pub fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Load one side of a comparison.
pub fn load_source(base_dir: &Path, source: &SourceConfig, log: &mut AuditLog) -> Result<Dataset, CliError> {
    let path = resolve(base_dir, &source.file);
    load_file(&path, source.label(), source.delimiter, log)
}

pub fn load_file(
    path: &Path,
    label: &str,
    delimiter: DelimiterChoice,
    log: &mut AuditLog,
) -> Result<Dataset, CliError> {
    let text = read_file_as_utf8(path)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot read {}: {e}", path.display())))?;
    load_dataset(label, &text, &LoadOptions::with_delimiter(delimiter.byte()), log)
        .map_err(|e| CliError::new(EXIT_INPUT, e.to_string()))
}
