//! Report writers

use crate::registry::ModeProfile;
use crate::{FetchOutcome, Source};
use std::path::Path;
use std::str::FromStr;

pub mod csv;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Unknown encoding name
    #[error("invalid encoding: {0} (expected plain or utf16)")]
    InvalidEncoding(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Byte encoding of the report file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportEncoding {
    /// Text as-is
    Plain,
    /// UTF-16 little-endian with a leading byte-order mark
    Utf16Le,
}

impl ReportEncoding {
    /// Encoding a device family's reports use unless told otherwise
    pub fn default_for(source: Source) -> Self {
        match source {
            Source::Opms => ReportEncoding::Plain,
            Source::Ipms => ReportEncoding::Utf16Le,
        }
    }
}

impl std::fmt::Display for ReportEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportEncoding::Plain => write!(f, "plain"),
            ReportEncoding::Utf16Le => write!(f, "utf16"),
        }
    }
}

impl FromStr for ReportEncoding {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "utf8" | "utf-8" => Ok(ReportEncoding::Plain),
            "utf16" | "utf-16" | "utf16le" | "utf-16le" => Ok(ReportEncoding::Utf16Le),
            _ => Err(OutputError::InvalidEncoding(s.to_string())),
        }
    }
}

/// Generic output writer
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;
}

/// Writer of one report row per fetch outcome
pub trait OutcomeWriter: OutputWriter {
    /// Write a single outcome row
    fn write_outcome(&mut self, outcome: &FetchOutcome) -> OutputResult<()>;

    /// Write several outcome rows in order
    fn write_outcomes(&mut self, outcomes: &[FetchOutcome]) -> OutputResult<()> {
        for outcome in outcomes {
            self.write_outcome(outcome)?;
        }
        Ok(())
    }
}

/// Write a complete report file: header then one row per outcome
///
/// Returns the number of rows written, header excluded.
pub fn write_report<P: AsRef<Path>>(
    path: P,
    profile: &'static ModeProfile,
    encoding: ReportEncoding,
    outcomes: &[FetchOutcome],
) -> OutputResult<u64> {
    let mut writer = csv::CsvReportWriter::create(path, profile, encoding)?;
    writer.write_outcomes(outcomes)?;
    let rows = writer.rows_written();
    writer.close_and_sync()?;
    Ok(rows)
}
