//! # POP Telemetry Library
//!
//! Polls the SmartPOP telemetry API for a fleet of points-of-presence, reduces
//! each device's raw sensor samples into a handful of summary metrics and
//! writes a tabular CSV report.
//!
//! ## Features
//!
//! - **Two device families**: OPMS and IPMS, each with its own URL layout
//! - **Four measurement modes**: fan speed, temperature, air conditioning, current
//! - **Dispatch throttling**: cooldown pause after every N launched requests
//! - **Long ranges**: split a long window per device and merge the partial results
//! - **Two report encodings**: plain text or UTF-16LE with byte-order mark
//!
//! ## Quick Start
//!
//! ```no_run
//! use pop_telemetry::downloader::BatchFetcher;
//! use pop_telemetry::fetcher::directory::DirectoryClient;
//! use pop_telemetry::fetcher::http::TelemetryHttpClient;
//! use pop_telemetry::output::{write_report, ReportEncoding};
//! use pop_telemetry::registry::profile;
//! use pop_telemetry::{DeviceLimit, Mode, Source, TimeInterval};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = TelemetryHttpClient::shared("my-token");
//! let window = TimeInterval::new(1741478400, 1741564800)?;
//! let mode_profile = profile(Source::Opms, Mode::Fan);
//!
//! let directory = DirectoryClient::new(http.clone(), "https://smartpop.fpt.net/api", Source::Opms);
//! let endpoints = directory.resolve(window, Mode::Fan, DeviceLimit::Unbounded).await?;
//!
//! let fetcher = BatchFetcher::new(http, mode_profile.reducer, 50, Duration::from_secs(20));
//! let report = fetcher.fetch_all(endpoints).await;
//!
//! write_report("fan_speeds.csv", mode_profile, ReportEncoding::Plain, &report.outcomes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`registry`] - (source, mode) → URL path, reducer and column schema
//! - [`fetcher`] - HTTP client, device directory and envelope decoding
//! - [`aggregate`] - Pure per-mode reductions over raw samples
//! - [`downloader`] - Throttled concurrent fetch, range splitting and merging
//! - [`output`] - CSV report writer (plain or UTF-16LE)
//! - [`cli`] - Command line entry points

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Per-mode sample reductions
pub mod aggregate;

/// CLI command implementations
pub mod cli;

/// Fetch orchestration
pub mod downloader;

/// Telemetry API access
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Report writers
pub mod output;

/// Mode/source registry
pub mod registry;

/// Errors raised while parsing the core tags and values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Unknown measurement mode
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// Unknown device family
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Time window ends before it starts
    #[error("invalid time interval: end {end} is before start {start}")]
    InvalidInterval {
        /// Start (epoch seconds)
        start: i64,
        /// End (epoch seconds)
        end: i64,
    },

    /// Window length does not fit in an i64 second count
    #[error("time interval {start}..{end} is too long")]
    IntervalOverflow {
        /// Start (epoch seconds)
        start: i64,
        /// End (epoch seconds)
        end: i64,
    },
}

/// Measurement mode requested from the telemetry API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Fan speed at full control
    #[serde(rename = "FAN")]
    Fan,
    /// Temperature sensors
    #[serde(rename = "TEMP")]
    Temp,
    /// Air-conditioning on/off durations
    #[serde(rename = "AC")]
    Ac,
    /// Current draw (not aggregated yet)
    #[serde(rename = "CURRENT")]
    Current,
}

impl Mode {
    /// All modes, in registry order
    pub const ALL: [Mode; 4] = [Mode::Fan, Mode::Temp, Mode::Ac, Mode::Current];
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Fan => "FAN",
            Mode::Temp => "TEMP",
            Mode::Ac => "AC",
            Mode::Current => "CURRENT",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Mode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FAN" => Ok(Mode::Fan),
            "TEMP" => Ok(Mode::Temp),
            "AC" => Ok(Mode::Ac),
            "CURRENT" => Ok(Mode::Current),
            _ => Err(ModelError::InvalidMode(s.to_string())),
        }
    }
}

/// Device family served by the telemetry API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Outdoor POP monitoring
    #[serde(rename = "opms")]
    Opms,
    /// Indoor POP monitoring
    #[serde(rename = "ipms")]
    Ipms,
}

impl Source {
    /// Number of leading characters of the device name kept as OPMS site label
    const OPMS_SITE_LABEL_LEN: usize = 7;

    /// Derive the report site label from a directory device name
    pub fn site_label(&self, device_name: &str) -> String {
        match self {
            Source::Opms => device_name
                .chars()
                .take(Self::OPMS_SITE_LABEL_LEN)
                .collect(),
            Source::Ipms => device_name.to_string(),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::Opms => "opms",
            Source::Ipms => "ipms",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Source {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opms" => Ok(Source::Opms),
            "ipms" => Ok(Source::Ipms),
            _ => Err(ModelError::InvalidSource(s.to_string())),
        }
    }
}

/// Device entry from the directory API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Numeric device id
    pub id: i64,
    /// Display name as returned by the directory
    pub name: String,
    /// Site label used in reports
    pub site: String,
}

/// One query descriptor per (device, mode) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Device the query belongs to
    pub device_id: i64,
    /// Fully substituted query URL
    pub url: String,
    /// Site label carried through to the report
    pub site: String,
}

/// Half-open time window `[start, end)` in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    /// Inclusive start (epoch seconds)
    pub start: i64,
    /// Exclusive end (epoch seconds)
    pub end: i64,
}

impl TimeInterval {
    /// Create a window, rejecting negative or unrepresentable durations
    pub fn new(start: i64, end: i64) -> Result<Self, ModelError> {
        if end < start {
            return Err(ModelError::InvalidInterval { start, end });
        }
        if end.checked_sub(start).is_none() {
            return Err(ModelError::IntervalOverflow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window length in seconds
    pub fn duration_secs(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// How many directory entries to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLimit {
    /// Keep every device
    Unbounded,
    /// Keep the first N devices in directory order
    First(usize),
}

impl DeviceLimit {
    /// Map the command-line convention (`-1` = unbounded) onto a limit
    pub fn from_signed(limit: i64) -> Option<Self> {
        match limit {
            -1 => Some(DeviceLimit::Unbounded),
            n if n >= 0 => Some(DeviceLimit::First(n as usize)),
            _ => None,
        }
    }
}

/// Summary metrics produced for one device in one mode
///
/// Keys are fixed per mode; a key that was never written reads as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModeResult {
    values: BTreeMap<&'static str, f64>,
}

impl ModeResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a result with every key set to 0
    pub fn zeroed(keys: &[&'static str]) -> Self {
        Self {
            values: keys.iter().map(|k| (*k, 0.0)).collect(),
        }
    }

    /// Set a metric
    pub fn insert(&mut self, key: &'static str, value: f64) {
        self.values.insert(key, value);
    }

    /// Add to a metric, default-initialising it to 0
    pub fn accumulate(&mut self, key: &'static str, value: f64) {
        *self.values.entry(key).or_insert(0.0) += value;
    }

    /// Read a metric (0 when absent)
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Whether the key has been populated
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of populated keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key has been populated
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (key, value) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Apply `f` to every value in place
    pub fn map_values(&mut self, f: impl Fn(f64) -> f64) {
        for value in self.values.values_mut() {
            *value = f(*value);
        }
    }
}

/// Result of fetching and reducing one endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Samples were fetched and reduced
    Success {
        /// Originating device
        device_id: i64,
        /// Site label
        site: String,
        /// Reduced metrics
        result: ModeResult,
    },
    /// Fetch or reduction failed for this endpoint only
    Failure {
        /// Originating device
        device_id: i64,
        /// Site label
        site: String,
        /// Human-readable reason
        reason: String,
    },
}

impl FetchOutcome {
    /// Successful outcome for an endpoint
    pub fn success(endpoint: &Endpoint, result: ModeResult) -> Self {
        FetchOutcome::Success {
            device_id: endpoint.device_id,
            site: endpoint.site.clone(),
            result,
        }
    }

    /// Failed outcome for an endpoint
    pub fn failure(endpoint: &Endpoint, reason: impl Into<String>) -> Self {
        FetchOutcome::Failure {
            device_id: endpoint.device_id,
            site: endpoint.site.clone(),
            reason: reason.into(),
        }
    }

    /// Device id of the originating endpoint
    pub fn device_id(&self) -> i64 {
        match self {
            FetchOutcome::Success { device_id, .. } | FetchOutcome::Failure { device_id, .. } => {
                *device_id
            }
        }
    }

    /// Site label of the originating endpoint
    pub fn site(&self) -> &str {
        match self {
            FetchOutcome::Success { site, .. } | FetchOutcome::Failure { site, .. } => site,
        }
    }

    /// Whether this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}
