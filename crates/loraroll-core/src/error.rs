//! Error types for loraroll-core
//!
//! Provides a small error hierarchy with thiserror for graceful degradation:
//! nothing in the core is allowed to kill a generation run.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for loraroll operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    // ===================
    // Store Errors
    // ===================
    #[error("Unknown folder: {folder}")]
    UnknownFolder { folder: String },
}

/// Severity level for errors during a scan or cache populate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical, the entry or cache file is skipped
    Warning,
    /// Significant but not fatal for the run
    Error,
}

/// Individual error entry in a scan report
#[derive(Debug, Clone)]
pub struct ScanError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
}

impl ScanError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
        }
    }
}

/// Report of problems encountered while scanning a folder and building entries
///
/// Enables graceful degradation by tracking partial failures instead of
/// failing the whole populate on any single bad file.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub errors: Vec<ScanError>,
    /// Model files matched by the extension filter
    pub files_seen: usize,
    /// Entries that made it into the cache list
    pub entries_built: usize,
    /// Files skipped because no activation text was present (strict mode)
    pub skipped_no_activation: usize,
    /// Sidecar files that existed but failed to read or parse
    pub sidecar_failures: usize,
}

impl ScanReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ScanError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ScanError::warning(source, message));
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &ScanError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }

    /// Returns (warnings, errors) counts
    pub fn error_count(&self) -> (usize, usize) {
        let warnings = self
            .errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
            .count();
        (warnings, self.errors.len() - warnings)
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: ScanReport) {
        self.errors.extend(other.errors);
        self.files_seen += other.files_seen;
        self.entries_built += other.entries_built;
        self.skipped_no_activation += other.skipped_no_activation;
        self.sidecar_failures += other.sidecar_failures;
    }
}
