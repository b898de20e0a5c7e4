//! Long-range command

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::report::{parse_positive, Cli, RunSummary};
use super::window::parse_window;
use super::CliError;
use crate::downloader::config::{DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN_SECS, LONG_RANGE_DELTA_SECS};
use crate::downloader::{LongRangeJob, LongRangeMerger};
use crate::output::{write_report, ReportEncoding};
use crate::{Mode, Source};

/// Arguments of the `long-range` command
#[derive(Parser, Debug)]
pub struct LongRangeArgs {
    /// Device family (opms or ipms)
    #[arg(long)]
    pub source: Source,

    /// Measurement mode (FAN, TEMP, AC or CURRENT)
    #[arg(long)]
    pub mode: Mode,

    /// Device id
    #[arg(long)]
    pub device_id: i64,

    /// Window start (epoch seconds, RFC3339 or YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Window end, exclusive (epoch seconds, RFC3339 or YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Sub-window length in seconds
    #[arg(long, default_value_t = LONG_RANGE_DELTA_SECS)]
    pub delta_secs: i64,

    /// Requests dispatched per cooldown cycle
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_positive)]
    pub batch_size: usize,

    /// Cooldown between batches, in seconds
    #[arg(long, default_value_t = DEFAULT_COOLDOWN_SECS)]
    pub cooldown: u64,

    /// Report path (default `{source}_{deviceId}_{MODE}.csv`)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Report encoding (plain or utf16); defaults per source
    #[arg(long)]
    pub encoding: Option<ReportEncoding>,
}

impl LongRangeArgs {
    /// Split, fetch, merge and write the single-row report
    pub async fn execute(&self, cli: &Cli) -> Result<RunSummary, CliError> {
        if self.delta_secs <= 0 {
            return Err(CliError::InvalidArgument(format!(
                "delta-secs must be positive, got {}",
                self.delta_secs
            )));
        }

        let window = parse_window(&self.start, &self.end)?;
        let http = cli.http_client()?;
        let job = LongRangeJob {
            source: self.source,
            mode: self.mode,
            device_id: self.device_id,
            window,
            delta_secs: self.delta_secs,
        };

        let merger = LongRangeMerger::new(
            http,
            cli.base_url.clone(),
            self.batch_size,
            Duration::from_secs(self.cooldown),
        );
        let report = merger.run(&job).await?;

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| job.default_output_path());
        let encoding = self
            .encoding
            .unwrap_or_else(|| ReportEncoding::default_for(self.source));
        let rows = write_report(&output, job.profile(), encoding, std::slice::from_ref(&report.merged))?;

        info!(
            device_id = job.device_id,
            intervals = report.intervals,
            output = %output.display(),
            "Long-range report written"
        );

        let summary = RunSummary::new(
            "long-range",
            self.source,
            self.mode,
            window,
            &output,
            encoding,
            &report.fetch,
            rows,
        );
        summary.print(cli.output_format);
        Ok(summary)
    }
}
