//! Response envelopes
//!
//! Sample endpoints answer
//! `{"data": {"data": [ {..}, .. ], "success": bool}, "success": bool}`;
//! only the inner flag decides whether the call succeeded. The directory
//! answers `{"data": [ {"id": .., "name": ..}, .. ]}`.

use serde::Deserialize;

use crate::aggregate::RawSample;
use crate::fetcher::FetcherResult;

/// Reason recorded when the inner success flag is false
pub const API_CALL_FAILED: &str = "API call failed";

/// Outer sample envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Inner payload
    #[serde(default)]
    pub data: EnvelopeBody,
    /// Outer flag, not consulted
    #[serde(default)]
    pub success: bool,
}

/// Inner sample payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeBody {
    /// Raw samples, absent on some failures
    #[serde(default)]
    pub data: Option<Vec<RawSample>>,
    /// Whether the upstream call succeeded
    #[serde(default)]
    pub success: bool,
}

impl Envelope {
    /// Decode an envelope from a response body
    pub fn from_slice(body: &[u8]) -> FetcherResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Samples of a successful call, `None` when the inner flag is false
    pub fn into_samples(self) -> Option<Vec<RawSample>> {
        if self.data.success {
            Some(self.data.data.unwrap_or_default())
        } else {
            None
        }
    }
}

/// Directory listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryResponse {
    /// Devices in directory order
    #[serde(default)]
    pub data: Vec<DirectoryEntry>,
}

/// One directory entry; extra fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    /// Device id
    pub id: i64,
    /// Device display name
    #[serde(default)]
    pub name: String,
}
