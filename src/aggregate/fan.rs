//! Fan speed reduction
//!
//! For each of the four fan channels, averages the reported speed over the
//! samples where that channel's control value is exactly 100.

use super::FieldLookup;
use crate::ModeResult;

/// Channel 1 key
pub const F1: &str = "f1";
/// Channel 2 key
pub const F2: &str = "f2";
/// Channel 3 key
pub const F3: &str = "f3";
/// Channel 4 key
pub const F4: &str = "f4";

/// All keys, channel order
pub const KEYS: [&str; 4] = [F1, F2, F3, F4];

/// Control value meaning "fan at full duty"
const FULL_CONTROL: f64 = 100.0;

/// Floored mean speed per channel at full control, 0 for channels that never qualified
pub fn reduce<S: FieldLookup>(samples: &[S]) -> ModeResult {
    let mut sums = [0.0_f64; 4];
    let mut counts = [0_u32; 4];

    for sample in samples {
        for channel in 0..KEYS.len() {
            let control = sample.number(&format!("control_fan_pop_{channel}"));
            let rps = sample.number(&format!("rps_fan_pop_{channel}"));

            if let (Some(control), Some(rps)) = (control, rps) {
                if control == FULL_CONTROL {
                    sums[channel] += rps;
                    counts[channel] += 1;
                }
            }
        }
    }

    let mut result = ModeResult::new();
    for (channel, key) in KEYS.iter().enumerate() {
        let value = if counts[channel] > 0 {
            (sums[channel] / f64::from(counts[channel])).floor()
        } else {
            0.0
        };
        result.insert(key, value);
    }
    result
}
