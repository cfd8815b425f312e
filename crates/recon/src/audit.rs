//! Audit trail of a comparison run.
//!
//! Every call is recorded with a local wall-clock timestamp and mirrored to
//! `tracing`. The rendered log is the persisted artefact of a run.

use std::fmt;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::error::Result;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogSeverity {
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "WARN")]
    Warning,
    #[serde(rename = "ERROR")]
    Error,
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub severity: LogSeverity,
    pub message: String,
    /// Section headers mark the start of a pipeline stage.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub header: bool,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp, self.severity, self.message)
    }
}

/// Append-only, single-writer log shared by the stages of one run.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Vec<LogEntry>,
    warning_detected: bool,
    error_detected: bool,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&mut self, message: impl Into<String>, header: bool) {
        let message = message.into();
        if header {
            tracing::info!("{message}");
        } else {
            tracing::debug!("{message}");
        }
        self.push(LogSeverity::Debug, message, header);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warning_detected = true;
        self.push(LogSeverity::Warning, message, false);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.error_detected = true;
        self.push(LogSeverity::Error, message, false);
    }

    fn push(&mut self, severity: LogSeverity, message: String, header: bool) {
        self.entries.push(LogEntry {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            severity,
            message,
            header,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warning_detected(&self) -> bool {
        self.warning_detected
    }

    pub fn error_detected(&self) -> bool {
        self.error_detected
    }

    pub fn count(&self, severity: LogSeverity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }

    /// One line per entry: `<timestamp> <SEVERITY> <message>`.
    pub fn render(&self) -> String {
        let mut body = String::new();
        for entry in &self.entries {
            body.push_str(&entry.to_string());
            body.push('\n');
        }
        body
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}
