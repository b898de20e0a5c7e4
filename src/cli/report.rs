//! Fleet report command and shared CLI definitions

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use super::long_range::LongRangeArgs;
use super::window::parse_window;
use super::CliError;
use crate::downloader::config::{DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN_SECS};
use crate::downloader::{BatchFetcher, FetchReport};
use crate::fetcher::directory::DirectoryClient;
use crate::fetcher::http::TelemetryHttpClient;
use crate::output::{write_report, ReportEncoding};
use crate::registry;
use crate::{DeviceLimit, Mode, Source, TimeInterval};

/// Parse a strictly positive count
pub(crate) fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(value)
}

/// POP telemetry report CLI
#[derive(Parser, Debug)]
#[command(name = "pop-telemetry")]
#[command(about = "Fetch POP device telemetry and write summary reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Access token sent as x-access-token
    #[arg(long, global = true, env = "SMARTPOP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = "SMARTPOP_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// HTTP client carrying the configured token
    pub fn http_client(&self) -> Result<TelemetryHttpClient, CliError> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(TelemetryHttpClient::shared(token)),
            _ => Err(CliError::ConfigurationError(
                "missing access token: pass --token or set SMARTPOP_TOKEN".to_string(),
            )),
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise one mode across every device of a family
    Report(ReportArgs),

    /// Summarise one device over a long window, split into sub-windows
    LongRange(LongRangeArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Arguments of the `report` command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Device family (opms or ipms)
    #[arg(long)]
    pub source: Source,

    /// Measurement mode (FAN, TEMP, AC or CURRENT)
    #[arg(long)]
    pub mode: Mode,

    /// Window start (epoch seconds, RFC3339 or YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Window end, exclusive (epoch seconds, RFC3339 or YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Keep only the first N devices (-1 keeps all)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub limit: i64,

    /// Requests dispatched per cooldown cycle
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_positive)]
    pub batch_size: usize,

    /// Cooldown between batches, in seconds
    #[arg(long, default_value_t = DEFAULT_COOLDOWN_SECS)]
    pub cooldown: u64,

    /// Also cap the number of requests in flight
    #[arg(long, value_parser = parse_positive)]
    pub max_in_flight: Option<usize>,

    /// Report path
    #[arg(long, default_value = "fan_speeds.csv")]
    pub output: PathBuf,

    /// Report encoding (plain or utf16); defaults per source
    #[arg(long)]
    pub encoding: Option<ReportEncoding>,
}

/// What a run did, printed at the end
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// `report` or `long-range`
    pub command: &'static str,
    /// Device family
    pub source: Source,
    /// Measurement mode
    pub mode: Mode,
    /// Window start (epoch seconds)
    pub start: i64,
    /// Window end (epoch seconds)
    pub end: i64,
    /// Report path
    pub output_path: String,
    /// Report encoding
    pub encoding: String,
    /// Endpoints dispatched
    pub endpoints: usize,
    /// Success outcomes
    pub successes: usize,
    /// Failure outcomes
    pub failures: usize,
    /// Endpoints with no outcome
    pub dropped: usize,
    /// Fetch tasks that panicked
    pub panicked: usize,
    /// Cooldown pauses
    pub cooldowns: usize,
    /// Rows written to the report
    pub rows_written: u64,
}

impl RunSummary {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        command: &'static str,
        source: Source,
        mode: Mode,
        window: TimeInterval,
        output: &Path,
        encoding: ReportEncoding,
        fetch: &FetchReport,
        rows_written: u64,
    ) -> Self {
        Self {
            command,
            source,
            mode,
            start: window.start,
            end: window.end,
            output_path: output.display().to_string(),
            encoding: encoding.to_string(),
            endpoints: fetch.dispatched,
            successes: fetch.successes(),
            failures: fetch.failures(),
            dropped: fetch.dropped(),
            panicked: fetch.panicked,
            cooldowns: fetch.cooldowns,
            rows_written,
        }
    }

    /// Print in the requested format
    pub fn print(&self, format: OutputFormat) {
        match format {
            OutputFormat::Json => match serde_json::to_string(self) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Failed to serialize summary: {}", e),
            },
            OutputFormat::Human => {
                println!("\n{} {} report completed", self.source, self.mode);
                println!("Output: {} ({})", self.output_path, self.encoding);
                println!("Endpoints: {}", self.endpoints);
                println!("Successes: {}", self.successes);
                println!("Failures: {}", self.failures);
                if self.dropped > 0 {
                    println!("Dropped (non-2xx): {}", self.dropped);
                }
                if self.panicked > 0 {
                    println!("Panicked tasks: {}", self.panicked);
                }
                println!("Cooldowns: {}", self.cooldowns);
                println!("Rows written: {}", self.rows_written);
            }
        }
    }
}

impl ReportArgs {
    /// Resolve, fetch, reduce and write the report
    pub async fn execute(&self, cli: &Cli) -> Result<RunSummary, CliError> {
        let window = parse_window(&self.start, &self.end)?;
        let limit = DeviceLimit::from_signed(self.limit).ok_or_else(|| {
            CliError::InvalidArgument(format!("limit must be -1 or non-negative, got {}", self.limit))
        })?;
        let http = cli.http_client()?;
        let profile = registry::profile(self.source, self.mode);

        info!(
            source = %self.source,
            mode = %self.mode,
            start = window.start,
            end = window.end,
            "Starting report"
        );

        let directory = DirectoryClient::new(http.clone(), cli.base_url.clone(), self.source);
        let endpoints = directory.resolve(window, self.mode, limit).await?;

        let fetcher = BatchFetcher::new(
            http,
            profile.reducer,
            self.batch_size,
            Duration::from_secs(self.cooldown),
        )
        .with_max_in_flight(self.max_in_flight)
        .with_progress(cli.output_format == OutputFormat::Human);
        let fetch = fetcher.fetch_all(endpoints).await;

        let encoding = self
            .encoding
            .unwrap_or_else(|| ReportEncoding::default_for(self.source));
        let rows = write_report(&self.output, profile, encoding, &fetch.outcomes)?;

        let summary = RunSummary::new(
            "report",
            self.source,
            self.mode,
            window,
            &self.output,
            encoding,
            &fetch,
            rows,
        );
        summary.print(cli.output_format);
        Ok(summary)
    }
}
