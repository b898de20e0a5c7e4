//! Fetch orchestration
//!
//! # Overview
//!
//! 1. **Fleet runs**: [`executor::BatchFetcher`] fetches one endpoint per
//!    device under a dispatch throttle and waits for all of them
//! 2. **Throttling**: [`rate_limit::DispatchThrottle`] pauses after every
//!    full batch; [`rate_limit::InFlightLimit`] optionally bounds concurrency
//! 3. **Long ranges**: [`split::split`] cuts a window into sub-windows and
//!    [`long_range::LongRangeMerger`] folds their results into one row
//!
//! # Quick Start
//!
//! ```no_run
//! use pop_telemetry::downloader::long_range::{LongRangeJob, LongRangeMerger};
//! use pop_telemetry::fetcher::http::TelemetryHttpClient;
//! use pop_telemetry::{Mode, Source, TimeInterval};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let job = LongRangeJob {
//!     source: Source::Opms,
//!     mode: Mode::Fan,
//!     device_id: 1363,
//!     window: TimeInterval::new(1740787200, 1743465600)?,
//!     delta_secs: 28_800,
//! };
//!
//! let merger = LongRangeMerger::new(
//!     TelemetryHttpClient::shared("my-token"),
//!     "https://smartpop.fpt.net/api",
//!     50,
//!     Duration::from_secs(20),
//! );
//! let report = merger.run(&job).await?;
//! println!("{} sub-windows, merged: {:?}", report.intervals, report.merged);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-endpoint problems never surface here; they become failure outcomes or
//! dropped endpoints inside the [`executor::FetchReport`]. Only argument and
//! URL construction errors are returned as [`DownloadError`].

pub mod config;
pub mod executor;
pub mod long_range;
pub mod progress;
pub mod rate_limit;
pub mod split;

pub use executor::{BatchFetcher, FetchReport};
pub use long_range::{LongRangeJob, LongRangeMerger};
pub use split::{split, TimeRangeSplitter};

use crate::fetcher::FetcherError;
use crate::registry::RegistryError;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Caller-supplied argument out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Query URL could not be built
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Directory or request setup failed
    #[error(transparent)]
    Fetcher(#[from] FetcherError),
}

/// Result type for download operations
pub type DownloadResult<T> = Result<T, DownloadError>;
