//! Per-mode reductions over raw telemetry samples
//!
//! Samples come back from the API as loosely typed JSON objects whose schema
//! depends on the endpoint. Reducers only ever ask a sample for a numeric
//! field through [`FieldLookup`]; a field that is absent or holds anything
//! other than a number contributes nothing and is never an error.
//!
//! Every reducer returns a [`ModeResult`] with its full, fixed key set.

use crate::ModeResult;
use serde::Deserialize;
use serde_json::{Map, Value};

pub mod ac;
pub mod fan;
pub mod temp;

/// Aggregation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    /// The reduction for this mode does not exist yet
    #[error("{0} aggregation is not yet supported")]
    NotYetSupported(crate::Mode),
}

/// Result type for aggregation
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Optional numeric field access on a raw record
pub trait FieldLookup {
    /// Value of `field` as a number, or `None` if absent or not numeric
    fn number(&self, field: &str) -> Option<f64>;
}

impl FieldLookup for Map<String, Value> {
    fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }
}

/// One raw sample as decoded from the response envelope
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawSample(Map<String, Value>);

impl RawSample {
    /// Build a sample from `(field, value)` pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Raw JSON value of a field
    pub fn raw(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl FieldLookup for RawSample {
    fn number(&self, field: &str) -> Option<f64> {
        self.0.number(field)
    }
}

/// Reduction strategy selected by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Mean fan speed of samples where the channel runs at control 100
    FanAtFullControl,
    /// Min / max / mean of a single temperature sensor
    TempSingleSensor,
    /// Min / max of four temperature sensors
    TempQuadSensor,
    /// On/off durations by control flag and by current draw
    AirConditioning,
    /// Current draw, not implemented yet
    CurrentPending,
}

impl Reducer {
    /// Metric keys this reducer always populates
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Reducer::FanAtFullControl => &fan::KEYS,
            Reducer::TempSingleSensor => &temp::SINGLE_KEYS,
            Reducer::TempQuadSensor => &temp::QUAD_KEYS,
            Reducer::AirConditioning => &ac::KEYS,
            Reducer::CurrentPending => &[],
        }
    }
}

/// Reduce a batch of samples with the given strategy
///
/// # Errors
/// Returns [`AggregateError::NotYetSupported`] for [`Reducer::CurrentPending`],
/// which is distinct from a computed result with no contributing samples.
pub fn reduce<S: FieldLookup>(samples: &[S], reducer: Reducer) -> AggregateResult<ModeResult> {
    match reducer {
        Reducer::FanAtFullControl => Ok(fan::reduce(samples)),
        Reducer::TempSingleSensor => Ok(temp::reduce_single(samples)),
        Reducer::TempQuadSensor => Ok(temp::reduce_quad(samples)),
        Reducer::AirConditioning => Ok(ac::reduce(samples)),
        Reducer::CurrentPending => Err(AggregateError::NotYetSupported(crate::Mode::Current)),
    }
}
