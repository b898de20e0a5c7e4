//! Fixed-size splitting of a time window

use crate::downloader::{DownloadError, DownloadResult};
use crate::TimeInterval;

/// Lazy sequence of consecutive sub-windows covering `[start, end)`
///
/// Every sub-window is `delta` seconds long except possibly the last, which
/// is clamped to `end`. The iterator is consumed as it is read.
#[derive(Debug)]
pub struct TimeRangeSplitter {
    cursor: i64,
    end: i64,
    delta: i64,
}

impl Iterator for TimeRangeSplitter {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let start = self.cursor;
        let end = start.saturating_add(self.delta).min(self.end);
        self.cursor = end;
        Some(TimeInterval { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = interval_count(self.end.saturating_sub(self.cursor), self.delta);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimeRangeSplitter {}

/// Split `window` into `delta_secs`-long pieces
///
/// # Errors
/// Returns [`DownloadError::InvalidArgument`] if `delta_secs` is not positive
pub fn split(window: TimeInterval, delta_secs: i64) -> DownloadResult<TimeRangeSplitter> {
    if delta_secs <= 0 {
        return Err(DownloadError::InvalidArgument(format!(
            "split length must be positive, got {delta_secs}"
        )));
    }
    Ok(TimeRangeSplitter {
        cursor: window.start,
        end: window.end,
        delta: delta_secs,
    })
}

/// `ceil(span / delta)` without overflow
fn interval_count(span: i64, delta: i64) -> usize {
    if span <= 0 {
        return 0;
    }
    let full = span / delta;
    let partial = i64::from(span % delta != 0);
    (full + partial) as usize
}
