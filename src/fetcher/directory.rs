//! Device directory and endpoint resolution

use tracing::{info, warn};

use crate::downloader::config::DIRECTORY_TIMEOUT;
use crate::fetcher::envelope::{DirectoryEntry, DirectoryResponse};
use crate::fetcher::http::TelemetryHttpClient;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::registry::{self, ModeProfile};
use crate::{Device, DeviceLimit, Endpoint, Mode, Source, TimeInterval};

/// Reads the device directory of one device family
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: TelemetryHttpClient,
    base_url: String,
    source: Source,
}

impl DirectoryClient {
    /// Create a directory client for `source` under `base_url`
    pub fn new(http: TelemetryHttpClient, base_url: impl Into<String>, source: Source) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            source,
        }
    }

    /// Directory URL for this family
    pub fn directory_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            registry::directory_path(self.source)
        )
    }

    /// List every device in directory order
    ///
    /// Any failure (network, status, body) is logged and yields an empty list.
    pub async fn list_devices(&self) -> Vec<Device> {
        let url = self.directory_url();
        match self
            .http
            .get_json::<DirectoryResponse>(&url, DIRECTORY_TIMEOUT, "directory")
            .await
        {
            Ok(response) => {
                let devices = to_devices(self.source, response.data);
                info!(source = %self.source, count = devices.len(), "Directory loaded");
                devices
            }
            Err(e) => {
                crate::metrics::record_directory_failure();
                warn!(source = %self.source, error = %e, "Directory unavailable, continuing with no devices");
                Vec::new()
            }
        }
    }

    /// Resolve one endpoint per device for `mode` over `window`
    ///
    /// An empty result means there is nothing to fetch, not success.
    ///
    /// # Errors
    /// - [`FetcherError::InvalidArgument`] if `limit` exceeds the directory size
    /// - [`FetcherError::Registry`] if a query URL cannot be built
    pub async fn resolve(
        &self,
        window: TimeInterval,
        mode: Mode,
        limit: DeviceLimit,
    ) -> FetcherResult<Vec<Endpoint>> {
        let devices = self.list_devices().await;
        let profile = registry::profile(self.source, mode);
        build_endpoints(&self.base_url, profile, &devices, window, limit)
    }
}

fn to_devices(source: Source, entries: Vec<DirectoryEntry>) -> Vec<Device> {
    entries
        .into_iter()
        .map(|entry| Device {
            id: entry.id,
            site: source.site_label(&entry.name),
            name: entry.name,
        })
        .collect()
}

/// Truncate `devices` to `limit` and build their query endpoints
///
/// A limit larger than the device list is rejected rather than clamped. An
/// empty device list is returned as-is regardless of the limit, since the
/// directory may simply have been unavailable.
pub fn build_endpoints(
    base_url: &str,
    profile: &ModeProfile,
    devices: &[Device],
    window: TimeInterval,
    limit: DeviceLimit,
) -> FetcherResult<Vec<Endpoint>> {
    if devices.is_empty() {
        return Ok(Vec::new());
    }

    let selected = match limit {
        DeviceLimit::Unbounded => devices,
        DeviceLimit::First(n) if n <= devices.len() => &devices[..n],
        DeviceLimit::First(n) => {
            return Err(FetcherError::InvalidArgument(format!(
                "limit {} exceeds directory size {}",
                n,
                devices.len()
            )))
        }
    };

    selected
        .iter()
        .map(|device| -> FetcherResult<Endpoint> {
            Ok(Endpoint {
                device_id: device.id,
                url: profile.query_url(base_url, device.id, window)?,
                site: device.site.clone(),
            })
        })
        .collect()
}
