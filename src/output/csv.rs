//! CSV report writer
//!
//! Header is `PI ID, POP, Status` followed by the profile's columns. Success
//! rows carry one value per column; failure rows are always
//! `id, site, error, "", reason`, so row lengths differ within one file and
//! the underlying csv writer runs in flexible mode.

use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::{OutcomeWriter, OutputError, OutputResult, OutputWriter, ReportEncoding};
use crate::registry::ModeProfile;
use crate::FetchOutcome;

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Leading columns of every row
pub const FIXED_HEADER: [&str; 3] = ["PI ID", "POP", "Status"];

/// Byte-order mark written first by [`Utf16LeWriter`]
pub const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// Transcodes a UTF-8 byte stream to UTF-16LE
///
/// The BOM is written on construction. Input may split a multi-byte
/// character across `write` calls; the incomplete tail is held back until
/// the rest arrives.
pub struct Utf16LeWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> Utf16LeWriter<W> {
    /// Wrap `inner` and emit the BOM
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_all(&UTF16LE_BOM)?;
        Ok(Self {
            inner,
            pending: Vec::new(),
        })
    }

    /// Unwrap the inner writer
    ///
    /// Fails if a truncated UTF-8 sequence is still pending.
    pub fn into_inner(self) -> io::Result<W> {
        if !self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "truncated UTF-8 sequence at end of report",
            ));
        }
        Ok(self.inner)
    }

    fn transcode_pending(&mut self) -> io::Result<()> {
        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };

        // Valid by construction of valid_up_to
        let text = std::str::from_utf8(&self.pending[..valid_up_to])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let encoded: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        self.inner.write_all(&encoded)?;
        self.pending.drain(..valid_up_to);
        Ok(())
    }
}

impl<W: Write> Write for Utf16LeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.transcode_pending()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// File sink in the selected encoding
pub enum ReportSink {
    /// Bytes written through unchanged
    Plain(BufWriter<File>),
    /// Bytes transcoded to UTF-16LE
    Utf16(Utf16LeWriter<BufWriter<File>>),
}

impl ReportSink {
    fn open(file: File, encoding: ReportEncoding) -> io::Result<Self> {
        let buffered = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        Ok(match encoding {
            ReportEncoding::Plain => ReportSink::Plain(buffered),
            ReportEncoding::Utf16Le => ReportSink::Utf16(Utf16LeWriter::new(buffered)?),
        })
    }

    fn into_file(self) -> io::Result<File> {
        let buffered = match self {
            ReportSink::Plain(buffered) => buffered,
            ReportSink::Utf16(writer) => writer.into_inner()?,
        };
        buffered.into_inner().map_err(|e| e.into_error())
    }
}

impl Write for ReportSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ReportSink::Plain(w) => w.write(buf),
            ReportSink::Utf16(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ReportSink::Plain(w) => w.flush(),
            ReportSink::Utf16(w) => w.flush(),
        }
    }
}

/// Render a metric for a report cell
pub fn format_value(value: f64) -> String {
    format!("{value:.2}")
}

/// CSV writer for one report
pub struct CsvReportWriter<W: Write> {
    writer: Writer<W>,
    profile: &'static ModeProfile,
    rows_written: u64,
}

impl CsvReportWriter<ReportSink> {
    /// Create the report file, its parent directories and the header row
    pub fn create<P: AsRef<Path>>(
        path: P,
        profile: &'static ModeProfile,
        encoding: ReportEncoding,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        info!(
            path = %path.display(),
            mode = %profile.mode,
            encoding = %encoding,
            "Creating report"
        );

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;
        let sink = ReportSink::open(file, encoding)
            .map_err(|e| OutputError::IoError(format!("Failed to write byte-order mark: {}", e)))?;

        Self::from_writer(sink, profile)
    }
}

impl<W: Write> CsvReportWriter<W> {
    /// Write the header to an arbitrary sink
    pub fn from_writer(inner: W, profile: &'static ModeProfile) -> OutputResult<Self> {
        let writer = WriterBuilder::new().flexible(true).from_writer(inner);
        let mut report = Self {
            writer,
            profile,
            rows_written: 0,
        };
        report.write_header()?;
        Ok(report)
    }

    fn write_header(&mut self) -> OutputResult<()> {
        let header = FIXED_HEADER
            .iter()
            .copied()
            .chain(self.profile.columns.iter().map(|c| c.header));
        self.writer
            .write_record(header)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))
    }

    /// Rows written so far, header excluded
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and return the sink
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {}", e)))
    }
}

impl<W: Write> OutcomeWriter for CsvReportWriter<W> {
    fn write_outcome(&mut self, outcome: &FetchOutcome) -> OutputResult<()> {
        let record: Vec<String> = match outcome {
            FetchOutcome::Success {
                device_id,
                site,
                result,
            } => {
                let mut record = vec![device_id.to_string(), site.clone(), "success".to_string()];
                record.extend(
                    self.profile
                        .columns
                        .iter()
                        .map(|c| format_value(result.get(c.key))),
                );
                record
            }
            FetchOutcome::Failure {
                device_id,
                site,
                reason,
            } => vec![
                device_id.to_string(),
                site.clone(),
                "error".to_string(),
                String::new(),
                reason.clone(),
            ],
        };

        self.writer
            .write_record(&record)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;
        self.rows_written += 1;
        Ok(())
    }
}

impl<W: Write> OutputWriter for CsvReportWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }
}

impl CsvReportWriter<ReportSink> {
    /// Close and sync the file to disk
    pub fn close_and_sync(mut self) -> OutputResult<()> {
        self.flush()?;
        let rows = self.rows_written;
        let file = self
            .into_inner()?
            .into_file()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {}", e)))?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;
        info!("Report closed: {} rows written", rows);
        Ok(())
    }
}
