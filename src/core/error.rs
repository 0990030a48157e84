//! Error types for TE-Enrich
//!
//! Run-fatal errors abort before the family loop; per-family errors are
//! recovered by the driver and reported on the diagnostic channel.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for an enrichment run
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Invalid configuration detected before any processing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O failure on a run-wide file (inputs, filtered copies, report)
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker pool could not be created
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(String),
}

impl EnrichmentError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        EnrichmentError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration problems, all fatal
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required input file does not exist
    #[error("{role} file not found: {path}")]
    MissingInput { role: &'static str, path: PathBuf },

    /// The external statistics tool could not be run
    #[error("'{0}' not found on the search path (is bedtools installed?)")]
    ToolNotFound(PathBuf),

    /// The chromosome-size file yielded no chromosome names
    #[error("No chromosome names found in {0}")]
    NoChromosomes(PathBuf),

    /// Names were found but no line carried a usable length
    #[error("No chromosome lengths found in {0}; bedtools needs a name and a length on every line")]
    NoChromosomeSizes(PathBuf),

    /// Worker count must be at least one
    #[error("Thread count must be at least 1")]
    ZeroThreads,
}

/// Failure while processing one TE family
///
/// Never aborts the run: the family is reported on the diagnostic channel
/// and excluded from the tabular report.
#[derive(Debug, Error)]
pub enum FamilyError {
    /// The working file for the family could not be written
    #[error("Failed to write working file {path}: {source}")]
    WorkingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess could not be started
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess ran past the configured timeout and was killed
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The subprocess exited unsuccessfully
    #[error("Exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    /// Waiting on or reading from the subprocess failed
    #[error("Subprocess I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The report text could not be parsed
    #[error("Malformed report: {0}")]
    Report(#[from] ReportParseError),
}

/// Errors from parsing the primitive's textual report
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportParseError {
    /// Output shorter than a complete report
    #[error("Expected at least {expected} lines, found {found}")]
    TooFewLines { expected: usize, found: usize },

    /// No `left right two-tail ratio` value line
    #[error("Missing p-value line")]
    MissingDataLine,

    /// One of the two contingency rows is absent
    #[error("Missing contingency row '{0}'")]
    MissingContingencyRow(&'static str),

    /// A contingency cell did not parse as a non-negative integer
    #[error("Invalid contingency count '{value}' in line '{line}'")]
    InvalidCount { line: String, value: String },
}

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Result type alias for per-family operations
pub type FamilyResultOf<T> = std::result::Result<T, FamilyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::MissingInput {
            role: "Region BED",
            path: PathBuf::from("/no/such.bed"),
        };
        assert_eq!(err.to_string(), "Region BED file not found: /no/such.bed");
    }

    #[test]
    fn test_enrichment_error_from_config() {
        let err: EnrichmentError = ConfigError::ZeroThreads.into();
        assert!(matches!(err, EnrichmentError::Config(ConfigError::ZeroThreads)));
    }

    #[test]
    fn test_family_error_from_report() {
        let err: FamilyError = ReportParseError::MissingDataLine.into();
        assert_eq!(err.to_string(), "Malformed report: Missing p-value line");
    }
}
