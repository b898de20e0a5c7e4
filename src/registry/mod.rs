//! Registry of (source, mode) profiles
//!
//! Every component that needs to know something mode-specific reads it from
//! here: the resolver takes the URL path, the fetcher takes the reducer and
//! the report writer takes the column schema. Nothing else switches on mode.

use crate::aggregate::{ac, fan, temp, Reducer};
use crate::{Mode, Source, TimeInterval};
use reqwest::Url;

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Pattern substitution produced something that is not a URL
    #[error("malformed query URL {url}: {reason}")]
    MalformedUrl {
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },
}

/// One report column after `PI ID, POP, Status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// CSV header text
    pub header: &'static str,
    /// Metric key in the [`crate::ModeResult`]
    pub key: &'static str,
}

/// Everything mode-specific for one device family
#[derive(Debug, Clone, Copy)]
pub struct ModeProfile {
    /// Device family
    pub source: Source,
    /// Measurement mode
    pub mode: Mode,
    /// Path template relative to the API base, `{id}` is the device id
    pub path: &'static str,
    /// Extra query parameters placed before the time window
    pub extra_query: &'static [(&'static str, &'static str)],
    /// Reduction applied to the fetched samples
    pub reducer: Reducer,
    /// Success-row columns
    pub columns: &'static [Column],
}

impl ModeProfile {
    /// Metric keys in column order
    pub fn keys(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.key).collect()
    }

    /// Build the query URL for one device and window
    ///
    /// # Errors
    /// Returns [`RegistryError::MalformedUrl`] if the substituted pattern does not parse
    pub fn query_url(
        &self,
        base_url: &str,
        device_id: i64,
        window: TimeInterval,
    ) -> Result<String, RegistryError> {
        let path = self.path.replace("{id}", &device_id.to_string());
        let mut url = format!("{}/{}?", base_url.trim_end_matches('/'), path);
        for (key, value) in self.extra_query {
            url.push_str(&format!("{key}={value}&"));
        }
        url.push_str(&format!(
            "tsdatesta={}&tsdateend={}",
            window.start, window.end
        ));

        Url::parse(&url).map_err(|e| RegistryError::MalformedUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        Ok(url)
    }
}

const FAN_COLUMNS: &[Column] = &[
    Column { header: "F1", key: fan::F1 },
    Column { header: "F2", key: fan::F2 },
    Column { header: "F3", key: fan::F3 },
    Column { header: "F4", key: fan::F4 },
];

const TEMP_QUAD_COLUMNS: &[Column] = &[
    Column { header: "T1 Max", key: temp::T1_MAX },
    Column { header: "T2 Max", key: temp::T2_MAX },
    Column { header: "T3 Max", key: temp::T3_MAX },
    Column { header: "T4 Max", key: temp::T4_MAX },
    Column { header: "T1 Min", key: temp::T1_MIN },
    Column { header: "T2 Min", key: temp::T2_MIN },
    Column { header: "T3 Min", key: temp::T3_MIN },
    Column { header: "T4 Min", key: temp::T4_MIN },
];

const TEMP_SINGLE_COLUMNS: &[Column] = &[
    Column { header: "T1 Min", key: temp::T1_MIN },
    Column { header: "T1 Max", key: temp::T1_MAX },
    Column { header: "T1 Avg", key: temp::T1_AVG },
];

const AC_COLUMNS: &[Column] = &[
    Column { header: "AC Duration On By Control", key: ac::ON_BY_CONTROL },
    Column { header: "AC Duration Off By Control", key: ac::OFF_BY_CONTROL },
    Column { header: "AC Duration On By Current", key: ac::ON_BY_CURRENT },
    Column { header: "AC Duration Off By Current", key: ac::OFF_BY_CURRENT },
];

const CURRENT_QUERY: &[(&str, &str)] = &[("lineid", "7"), ("regIds", "0")];

static PROFILES: [ModeProfile; 8] = [
    ModeProfile {
        source: Source::Opms,
        mode: Mode::Fan,
        path: "opms/pis/{id}/log/fan-pop",
        extra_query: &[],
        reducer: Reducer::FanAtFullControl,
        columns: FAN_COLUMNS,
    },
    ModeProfile {
        source: Source::Opms,
        mode: Mode::Temp,
        path: "opms/pis/{id}/log/temperature",
        extra_query: &[],
        reducer: Reducer::TempQuadSensor,
        columns: TEMP_QUAD_COLUMNS,
    },
    ModeProfile {
        source: Source::Opms,
        mode: Mode::Ac,
        path: "opms/pis/{id}/log/air-cond",
        extra_query: &[],
        reducer: Reducer::AirConditioning,
        columns: AC_COLUMNS,
    },
    ModeProfile {
        source: Source::Opms,
        mode: Mode::Current,
        path: "opms/pis/{id}/log/device/7",
        extra_query: CURRENT_QUERY,
        reducer: Reducer::CurrentPending,
        columns: &[],
    },
    ModeProfile {
        source: Source::Ipms,
        mode: Mode::Fan,
        path: "pis/{id}/log/fan-pop",
        extra_query: &[],
        reducer: Reducer::FanAtFullControl,
        columns: FAN_COLUMNS,
    },
    ModeProfile {
        source: Source::Ipms,
        mode: Mode::Temp,
        path: "pis/{id}/log/type",
        extra_query: &[("type", "sensor")],
        reducer: Reducer::TempSingleSensor,
        columns: TEMP_SINGLE_COLUMNS,
    },
    ModeProfile {
        source: Source::Ipms,
        mode: Mode::Ac,
        path: "pis/{id}/log/sensorrelayused",
        extra_query: &[],
        reducer: Reducer::AirConditioning,
        columns: AC_COLUMNS,
    },
    ModeProfile {
        source: Source::Ipms,
        mode: Mode::Current,
        path: "pis/{id}/log/device/7",
        extra_query: CURRENT_QUERY,
        reducer: Reducer::CurrentPending,
        columns: &[],
    },
];

/// Look up the profile for a device family and mode
pub fn profile(source: Source, mode: Mode) -> &'static ModeProfile {
    let family = match source {
        Source::Opms => 0,
        Source::Ipms => 4,
    };
    let offset = match mode {
        Mode::Fan => 0,
        Mode::Temp => 1,
        Mode::Ac => 2,
        Mode::Current => 3,
    };
    &PROFILES[family + offset]
}

/// Directory listing path (with its fixed query) for a device family
pub fn directory_path(source: Source) -> &'static str {
    match source {
        Source::Opms => "opms/pis?folderId=&isExtra=",
        Source::Ipms => "pis?folderId=&isExtra=",
    }
}
