//! Time window parsing for command-line arguments
//!
//! Accepts epoch seconds, RFC3339 with or without an offset (no offset means
//! UTC), or a bare `YYYY-MM-DD`. A bare date as the end of a window means the
//! following midnight, so the whole day is included.

use chrono::{DateTime, NaiveDate};

use super::CliError;
use crate::TimeInterval;

fn try_parse_epoch(input: &str) -> Option<i64> {
    let digits = input.strip_prefix('-').unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    input.parse().ok()
}

fn try_parse_rfc3339(input: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.timestamp());
    }
    None
}

fn parse_date(input: &str, which: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid {which} time '{input}': {e}")))
}

/// Parse a window start in epoch seconds
pub fn parse_start(input: &str) -> Result<i64, CliError> {
    let input = input.trim();
    if let Some(ts) = try_parse_epoch(input).or_else(|| try_parse_rfc3339(input)) {
        return Ok(ts);
    }

    let midnight = parse_date(input, "start")?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument("Invalid start time".to_string()))?;
    Ok(midnight.and_utc().timestamp())
}

/// Parse a window end in epoch seconds
pub fn parse_end(input: &str) -> Result<i64, CliError> {
    let input = input.trim();
    if let Some(ts) = try_parse_epoch(input).or_else(|| try_parse_rfc3339(input)) {
        return Ok(ts);
    }

    let next_midnight = parse_date(input, "end")?
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CliError::InvalidArgument("Invalid end time".to_string()))?;
    Ok(next_midnight.and_utc().timestamp())
}

/// Parse and validate a `[start, end)` window
pub fn parse_window(start: &str, end: &str) -> Result<TimeInterval, CliError> {
    Ok(TimeInterval::new(parse_start(start)?, parse_end(end)?)?)
}
