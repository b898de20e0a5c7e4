//! Fetch configuration defaults

use std::time::Duration;

/// Requests dispatched between two cooldown pauses.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Pause after each full batch, in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 20;

/// Deadline for the directory call.
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(20);

/// Deadline for one sample call. Sample windows can be large.
pub const SAMPLE_TIMEOUT: Duration = Duration::from_secs(60);

/// TCP connect timeout shared by every request.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sub-interval length for long-range queries (8 hours).
pub const LONG_RANGE_DELTA_SECS: i64 = 8 * 60 * 60;

/// Site label written for long-range rows.
pub const LONG_RANGE_SITE: &str = "SINGLE_POP";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://smartpop.fpt.net/api";

/// Default cooldown as a [`Duration`]
pub fn default_cooldown() -> Duration {
    Duration::from_secs(DEFAULT_COOLDOWN_SECS)
}
