//! Temperature reductions
//!
//! IPMS devices report one sensor (`sensoripmst0`) and get min, max and mean.
//! OPMS devices report four (`temperature_0..3`) and get min and max only.
//! A sensor with no readings reports 0 for each of its keys.

use super::FieldLookup;
use crate::ModeResult;

/// Sensor 1 minimum
pub const T1_MIN: &str = "t1Min";
/// Sensor 1 maximum
pub const T1_MAX: &str = "t1Max";
/// Sensor 1 mean
pub const T1_AVG: &str = "t1Avg";
/// Sensor 2 minimum
pub const T2_MIN: &str = "t2Min";
/// Sensor 2 maximum
pub const T2_MAX: &str = "t2Max";
/// Sensor 3 minimum
pub const T3_MIN: &str = "t3Min";
/// Sensor 3 maximum
pub const T3_MAX: &str = "t3Max";
/// Sensor 4 minimum
pub const T4_MIN: &str = "t4Min";
/// Sensor 4 maximum
pub const T4_MAX: &str = "t4Max";

/// Keys of the single-sensor variant
pub const SINGLE_KEYS: [&str; 3] = [T1_MIN, T1_MAX, T1_AVG];

/// Keys of the four-sensor variant
pub const QUAD_KEYS: [&str; 8] = [
    T1_MAX, T2_MAX, T3_MAX, T4_MAX, T1_MIN, T2_MIN, T3_MIN, T4_MIN,
];

const QUAD_MIN_KEYS: [&str; 4] = [T1_MIN, T2_MIN, T3_MIN, T4_MIN];
const QUAD_MAX_KEYS: [&str; 4] = [T1_MAX, T2_MAX, T3_MAX, T4_MAX];

const SINGLE_SENSOR_FIELD: &str = "sensoripmst0";

/// Running min/max/sum over one sensor
#[derive(Debug, Clone, Copy, Default)]
struct SensorStats {
    min: Option<f64>,
    max: Option<f64>,
    sum: f64,
}

impl SensorStats {
    fn observe(&mut self, value: f64) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.sum += value;
    }

    fn min_or_zero(&self) -> f64 {
        self.min.unwrap_or(0.0)
    }

    fn max_or_zero(&self) -> f64 {
        self.max.unwrap_or(0.0)
    }

    /// Floored `sum / batch_len`; samples without a reading still count
    fn floored_mean(&self, batch_len: usize) -> f64 {
        if batch_len == 0 {
            return 0.0;
        }
        (self.sum / batch_len as f64).floor()
    }
}

/// Single-sensor min, max and floored mean
///
/// The mean is taken over the whole batch, so a sample with a missing or
/// mistyped reading adds nothing to the sum but still counts.
pub fn reduce_single<S: FieldLookup>(samples: &[S]) -> ModeResult {
    let mut stats = SensorStats::default();
    for value in samples.iter().filter_map(|s| s.number(SINGLE_SENSOR_FIELD)) {
        stats.observe(value);
    }

    let mut result = ModeResult::new();
    result.insert(T1_MIN, stats.min_or_zero());
    result.insert(T1_MAX, stats.max_or_zero());
    result.insert(T1_AVG, stats.floored_mean(samples.len()));
    result
}

/// Four-sensor min and max
pub fn reduce_quad<S: FieldLookup>(samples: &[S]) -> ModeResult {
    let mut stats = [SensorStats::default(); 4];
    for sample in samples {
        for (sensor, slot) in stats.iter_mut().enumerate() {
            if let Some(value) = sample.number(&format!("temperature_{sensor}")) {
                slot.observe(value);
            }
        }
    }

    let mut result = ModeResult::new();
    for (sensor, slot) in stats.iter().enumerate() {
        result.insert(QUAD_MAX_KEYS[sensor], slot.max_or_zero());
        result.insert(QUAD_MIN_KEYS[sensor], slot.min_or_zero());
    }
    result
}
