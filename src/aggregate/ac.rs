//! Air-conditioning duration reduction
//!
//! Walks adjacent sample pairs and attributes the elapsed time between them
//! to an "on" or "off" bucket twice: once by the previous sample's control
//! flag, once by whether its current draw sat below the batch mean. Durations
//! are reported in whole minutes.

use super::FieldLookup;
use crate::ModeResult;

/// Minutes on according to the control flag
pub const ON_BY_CONTROL: &str = "acDurationOnByControl";
/// Minutes off according to the control flag
pub const OFF_BY_CONTROL: &str = "acDurationOffByControl";
/// Minutes on according to current draw
pub const ON_BY_CURRENT: &str = "acDurationOnByCurrent";
/// Minutes off according to current draw
pub const OFF_BY_CURRENT: &str = "acDurationOffByCurrent";

/// All keys, report order
pub const KEYS: [&str; 4] = [ON_BY_CONTROL, OFF_BY_CONTROL, ON_BY_CURRENT, OFF_BY_CURRENT];

const TIMESTAMP: &str = "timestamp";
const CONTROL: &str = "control_ac";
const CURRENT: &str = "current_ac";

const CONTROL_ON: f64 = 1.0;

/// Mean current draw over the whole batch
///
/// Samples without a reading add nothing to the sum but still count.
fn mean_current<S: FieldLookup>(samples: &[S]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().filter_map(|s| s.number(CURRENT)).sum();
    sum / samples.len() as f64
}

/// On/off minutes by control flag and by current draw
pub fn reduce<S: FieldLookup>(samples: &[S]) -> ModeResult {
    let mean = mean_current(samples);

    let mut on_by_control = 0.0;
    let mut off_by_control = 0.0;
    let mut on_by_current = 0.0;
    let mut off_by_current = 0.0;

    for pair in samples.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);

        let elapsed = match (prev.number(TIMESTAMP), next.number(TIMESTAMP)) {
            (Some(start), Some(end)) => end - start,
            _ => continue,
        };

        if let (Some(control), Some(_)) = (prev.number(CONTROL), next.number(CONTROL)) {
            if control == CONTROL_ON {
                on_by_control += elapsed;
            } else {
                off_by_control += elapsed;
            }
        }

        // Below-mean draw is read as the compressor running
        if let Some(current) = prev.number(CURRENT) {
            if current < mean {
                on_by_current += elapsed;
            } else {
                off_by_current += elapsed;
            }
        }
    }

    let minutes = |secs: f64| (secs / 60.0).floor();

    let mut result = ModeResult::new();
    result.insert(ON_BY_CONTROL, minutes(on_by_control));
    result.insert(OFF_BY_CONTROL, minutes(off_by_control));
    result.insert(ON_BY_CURRENT, minutes(on_by_current));
    result.insert(OFF_BY_CURRENT, minutes(off_by_current));
    result
}
