//! Long-range queries for a single device
//!
//! A long window is split into fixed sub-windows, each fetched as its own
//! endpoint, and the partial results are folded into one row. The fold sums
//! every key over the successful partials. FAN sums are then averaged over the
//! number of sub-windows; TEMP and AC sums are written as they are.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::aggregate::Reducer;
use crate::downloader::config::LONG_RANGE_SITE;
use crate::downloader::executor::{BatchFetcher, FetchReport};
use crate::downloader::split::split;
use crate::downloader::DownloadResult;
use crate::fetcher::http::TelemetryHttpClient;
use crate::registry::{self, ModeProfile};
use crate::{Endpoint, FetchOutcome, Mode, ModeResult, Source, TimeInterval};

/// One device, one mode, one long window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRangeJob {
    /// Device family
    pub source: Source,
    /// Measurement mode
    pub mode: Mode,
    /// Device id
    pub device_id: i64,
    /// Whole window
    pub window: TimeInterval,
    /// Sub-window length in seconds
    pub delta_secs: i64,
}

impl LongRangeJob {
    /// Registry profile of this job
    pub fn profile(&self) -> &'static ModeProfile {
        registry::profile(self.source, self.mode)
    }

    /// One endpoint per sub-window, all labelled `SINGLE_POP`
    pub fn endpoints(&self, base_url: &str) -> DownloadResult<Vec<Endpoint>> {
        let profile = self.profile();
        split(self.window, self.delta_secs)?
            .map(|sub| -> DownloadResult<Endpoint> {
                Ok(Endpoint {
                    device_id: self.device_id,
                    url: profile.query_url(base_url, self.device_id, sub)?,
                    site: LONG_RANGE_SITE.to_string(),
                })
            })
            .collect()
    }

    /// `{source}_{deviceId}_{MODE}.csv`
    pub fn default_output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_{}_{}.csv", self.source, self.device_id, self.mode))
    }
}

/// Fold partial outcomes into one result
///
/// Starts from every key of `profile` at 0 and adds each successful
/// partial. Failures contribute nothing.
pub fn merge(profile: &ModeProfile, outcomes: &[FetchOutcome], interval_count: usize) -> ModeResult {
    let mut merged = ModeResult::zeroed(profile.reducer.keys());
    for outcome in outcomes {
        if let FetchOutcome::Success { result, .. } = outcome {
            for (key, value) in result.iter() {
                merged.accumulate(key, value);
            }
        }
    }

    if profile.mode == Mode::Fan && interval_count > 0 {
        let n = interval_count as f64;
        merged.map_values(|sum| (sum / n).floor());
    }
    merged
}

/// Merged row plus the underlying run
#[derive(Debug, Clone)]
pub struct LongRangeReport {
    /// The single merged row
    pub merged: FetchOutcome,
    /// Sub-windows queried
    pub intervals: usize,
    /// Fetch run over the sub-windows
    pub fetch: FetchReport,
}

/// Runs [`LongRangeJob`]s through a throttled fetcher
#[derive(Debug, Clone)]
pub struct LongRangeMerger {
    http: TelemetryHttpClient,
    base_url: String,
    batch_size: usize,
    cooldown: Duration,
    request_timeout: Option<Duration>,
}

impl LongRangeMerger {
    /// Create a merger sending requests under `base_url`
    pub fn new(
        http: TelemetryHttpClient,
        base_url: impl Into<String>,
        batch_size: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            batch_size,
            cooldown,
            request_timeout: None,
        }
    }

    /// Override the per-request deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Fetch every sub-window of `job` and merge the results
    ///
    /// # Errors
    /// Fails on a non-positive split length or a malformed query URL
    pub async fn run(&self, job: &LongRangeJob) -> DownloadResult<LongRangeReport> {
        let profile = job.profile();
        let endpoints = job.endpoints(&self.base_url)?;
        let intervals = endpoints.len();

        info!(
            device_id = job.device_id,
            mode = %job.mode,
            intervals,
            delta_secs = job.delta_secs,
            "Starting long-range fetch"
        );

        let mut fetcher =
            BatchFetcher::new(self.http.clone(), profile.reducer, self.batch_size, self.cooldown);
        if let Some(timeout) = self.request_timeout {
            fetcher = fetcher.with_request_timeout(timeout);
        }
        let fetch = fetcher.fetch_all(endpoints).await;

        let site_endpoint = Endpoint {
            device_id: job.device_id,
            url: String::new(),
            site: LONG_RANGE_SITE.to_string(),
        };

        let merged = if profile.reducer == Reducer::CurrentPending {
            let reason = crate::aggregate::AggregateError::NotYetSupported(job.mode).to_string();
            FetchOutcome::failure(&site_endpoint, reason)
        } else {
            if fetch.successes() == 0 {
                warn!(device_id = job.device_id, "No sub-window succeeded, merged row is all zeros");
            }
            FetchOutcome::success(&site_endpoint, merge(profile, &fetch.outcomes, intervals))
        };

        Ok(LongRangeReport {
            merged,
            intervals,
            fetch,
        })
    }
}
