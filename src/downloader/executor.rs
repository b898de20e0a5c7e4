//! Throttled concurrent fetch over a list of endpoints

use futures::future::join_all;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::aggregate::{self, Reducer};
use crate::downloader::config::SAMPLE_TIMEOUT;
use crate::downloader::progress::FetchProgress;
use crate::downloader::rate_limit::{DispatchThrottle, InFlightLimit};
use crate::fetcher::envelope::{Envelope, API_CALL_FAILED};
use crate::fetcher::http::TelemetryHttpClient;
use crate::fetcher::FetcherError;
use crate::{Endpoint, FetchOutcome};

/// Everything a fetch run produced
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// One entry per endpoint that produced an outcome, completion order
    pub outcomes: Vec<FetchOutcome>,
    /// Endpoints launched
    pub dispatched: usize,
    /// Cooldown pauses taken
    pub cooldowns: usize,
    /// Tasks that panicked before reporting an outcome
    pub panicked: usize,
}

impl FetchReport {
    /// Success outcomes
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Failure outcomes
    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    /// Endpoints that produced no outcome (non-2xx status)
    ///
    /// Panicked tasks are counted in [`FetchReport::panicked`] instead.
    pub fn dropped(&self) -> usize {
        self.dispatched
            .saturating_sub(self.outcomes.len())
            .saturating_sub(self.panicked)
    }
}

/// Fetches and reduces one mode across many endpoints
///
/// Every endpoint gets its own task. The dispatcher pauses for the cooldown
/// after each full batch, then the call waits for every task before
/// returning. Without [`BatchFetcher::with_max_in_flight`] the number of
/// concurrently running requests is unbounded.
#[derive(Debug, Clone)]
pub struct BatchFetcher {
    http: TelemetryHttpClient,
    reducer: Reducer,
    throttle: DispatchThrottle,
    in_flight: Option<InFlightLimit>,
    request_timeout: Duration,
    show_progress: bool,
}

impl BatchFetcher {
    /// Create a fetcher with a dispatch throttle of `batch_size` / `cooldown`
    pub fn new(
        http: TelemetryHttpClient,
        reducer: Reducer,
        batch_size: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            http,
            reducer,
            throttle: DispatchThrottle::new(batch_size, cooldown),
            in_flight: None,
            request_timeout: SAMPLE_TIMEOUT,
            show_progress: false,
        }
    }

    /// Also cap the number of requests running at once
    pub fn with_max_in_flight(mut self, max: Option<usize>) -> Self {
        self.in_flight = max.map(InFlightLimit::new);
        self
    }

    /// Override the per-request deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Draw a terminal progress bar while fetching
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Dispatch throttle in use
    pub fn throttle(&self) -> DispatchThrottle {
        self.throttle
    }

    /// Fetch every endpoint and collect the outcomes
    pub async fn fetch_all(&self, endpoints: Vec<Endpoint>) -> FetchReport {
        let total = endpoints.len();
        if total == 0 {
            info!("No endpoints to fetch");
            return FetchReport::default();
        }

        info!(
            total,
            batch_size = self.throttle.batch_size(),
            cooldown_secs = self.throttle.cooldown().as_secs(),
            max_in_flight = self.in_flight.as_ref().map(InFlightLimit::max),
            "Starting fetch run"
        );

        let progress = if self.show_progress {
            FetchProgress::new(total, "Fetching")
        } else {
            FetchProgress::hidden()
        };

        // Sized to the endpoint count so senders never wait
        let (tx, mut rx) = mpsc::channel::<FetchOutcome>(total);
        let mut handles = Vec::with_capacity(total);
        let mut cooldowns = 0;

        for (index, endpoint) in endpoints.into_iter().enumerate() {
            let dispatched = index + 1;
            let tx = tx.clone();
            let http = self.http.clone();
            let reducer = self.reducer;
            let timeout = self.request_timeout;
            let in_flight = self.in_flight.clone();
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match &in_flight {
                    Some(limit) => limit.acquire().await,
                    None => None,
                };

                let outcome = fetch_endpoint(&http, reducer, &endpoint, timeout).await;
                progress.advance(&endpoint.site);

                if let Some(outcome) = outcome {
                    crate::metrics::record_outcome(outcome.is_success());
                    if tx.send(outcome).await.is_err() {
                        error!(device_id = endpoint.device_id, "Outcome channel closed early");
                    }
                }
            }));

            if self.throttle.should_pause(dispatched, total) {
                let cooldown = self.throttle.cooldown();
                info!(
                    "Processing {}/{}, cooling down for {} seconds",
                    dispatched,
                    total,
                    cooldown.as_secs()
                );
                crate::metrics::record_cooldown(cooldown);
                tokio::time::sleep(cooldown).await;
                cooldowns += 1;
            }
        }
        drop(tx);

        let mut panicked = 0;
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = %e, "Fetch task panicked");
                panicked += 1;
            }
        }
        progress.finish();

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        let report = FetchReport {
            outcomes,
            dispatched: total,
            cooldowns,
            panicked,
        };

        crate::metrics::record_dropped(report.dropped() as u64);
        if report.dropped() > 0 {
            warn!(
                dropped = report.dropped(),
                "Some endpoints returned a non-2xx status and were left out of the report"
            );
        }
        info!(
            dispatched = report.dispatched,
            successes = report.successes(),
            failures = report.failures(),
            dropped = report.dropped(),
            panicked = report.panicked,
            cooldowns = report.cooldowns,
            "Fetch run complete"
        );

        report
    }
}

/// Fetch, decode and reduce a single endpoint
///
/// Returns `None` when the upstream answers with a non-2xx status; such an
/// endpoint produces no outcome at all.
pub async fn fetch_endpoint(
    http: &TelemetryHttpClient,
    reducer: Reducer,
    endpoint: &Endpoint,
    timeout: Duration,
) -> Option<FetchOutcome> {
    let body = match http.get_bytes(&endpoint.url, timeout, "samples").await {
        Ok(body) => body,
        Err(FetcherError::HttpStatus(status)) => {
            warn!(device_id = endpoint.device_id, status, "Non-2xx status, dropping endpoint");
            return None;
        }
        Err(e) => {
            warn!(device_id = endpoint.device_id, error = %e, "Request failed");
            return Some(FetchOutcome::failure(endpoint, e.to_string()));
        }
    };

    let envelope = match Envelope::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(device_id = endpoint.device_id, error = %e, "Undecodable response");
            return Some(FetchOutcome::failure(endpoint, e.to_string()));
        }
    };

    let Some(samples) = envelope.into_samples() else {
        debug!(device_id = endpoint.device_id, "Upstream reported failure");
        return Some(FetchOutcome::failure(endpoint, API_CALL_FAILED));
    };

    match aggregate::reduce(&samples, reducer) {
        Ok(result) => {
            debug!(device_id = endpoint.device_id, samples = samples.len(), "Reduced samples");
            Some(FetchOutcome::success(endpoint, result))
        }
        Err(e) => Some(FetchOutcome::failure(endpoint, e.to_string())),
    }
}
