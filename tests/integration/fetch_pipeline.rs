//! End-to-end fleet report runs against the stub upstream

use pop_telemetry::downloader::BatchFetcher;
use pop_telemetry::fetcher::directory::DirectoryClient;
use pop_telemetry::fetcher::envelope::API_CALL_FAILED;
use pop_telemetry::fetcher::http::TelemetryHttpClient;
use pop_telemetry::fetcher::FetcherError;
use pop_telemetry::output::{write_report, ReportEncoding};
use pop_telemetry::registry::profile;
use pop_telemetry::{DeviceLimit, FetchOutcome, Mode, Source, TimeInterval};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

use super::stub::{client, fan_samples, Reply, StubServer, Upstream, TOKEN};

const DAY_START: i64 = 1_741_478_400;

fn window() -> TimeInterval {
    TimeInterval::new(DAY_START, DAY_START + 86_400).unwrap()
}

fn mixed_fleet() -> Upstream {
    Upstream::with_devices(&[
        (1, "HCM-Q1-POP-001"),
        (2, "HCM-Q1-POP-002"),
        (3, "HN-BD-POP-003"),
        (4, "HN-BD-POP-004"),
        (5, "DN-HC-POP-005"),
    ])
    .reply(1, Reply::Samples(fan_samples(&[40.0, 61.0])))
    .reply(2, Reply::Status(500))
    .reply(3, Reply::ApiFailure)
    .reply(4, Reply::Malformed)
    .reply(5, Reply::Samples(json!([])))
}

fn fetcher(http: TelemetryHttpClient) -> BatchFetcher {
    BatchFetcher::new(
        http,
        profile(Source::Opms, Mode::Fan).reducer,
        2,
        Duration::from_millis(10),
    )
}

#[tokio::test]
async fn test_report_rows_exclude_non_2xx_endpoints() {
    let stub = StubServer::start(mixed_fleet()).await;
    let http = client(TOKEN);

    let directory = DirectoryClient::new(http.clone(), stub.base_url.clone(), Source::Opms);
    let endpoints = directory
        .resolve(window(), Mode::Fan, DeviceLimit::Unbounded)
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 5);

    let report = fetcher(http).fetch_all(endpoints).await;

    assert_eq!(report.dispatched, 5);
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.successes(), 2);
    assert_eq!(report.failures(), 2);
    assert_eq!(report.dropped(), 1);
    assert_eq!(report.panicked, 0);
    assert_eq!(report.cooldowns, 2);
    assert_eq!(stub.upstream.hits(), 5);
    assert!(report.outcomes.iter().all(|o| o.device_id() != 2));

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fan_speeds.csv");
    let rows = write_report(
        &path,
        profile(Source::Opms, Mode::Fan),
        ReportEncoding::Plain,
        &report.outcomes,
    )
    .unwrap();
    assert_eq!(rows, 4);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "PI ID,POP,Status,F1,F2,F3,F4");
    assert!(lines.contains(&"1,HCM-Q1-,success,50.00,50.00,50.00,50.00"));
    assert!(lines.contains(&"5,DN-HC-P,success,0.00,0.00,0.00,0.00"));
    assert!(lines.contains(&"3,HN-BD-P,error,,API call failed"));
    assert!(lines.iter().any(|l| l.starts_with("4,HN-BD-P,error,,")));
}

#[tokio::test]
async fn test_failure_reasons() {
    let stub = StubServer::start(mixed_fleet()).await;
    let http = client(TOKEN);
    let directory = DirectoryClient::new(http.clone(), stub.base_url.clone(), Source::Opms);
    let endpoints = directory
        .resolve(window(), Mode::Fan, DeviceLimit::First(4))
        .await
        .unwrap();

    let report = fetcher(http).fetch_all(endpoints).await;

    for outcome in &report.outcomes {
        match outcome {
            FetchOutcome::Failure { device_id: 3, reason, .. } => {
                assert_eq!(reason, API_CALL_FAILED);
            }
            FetchOutcome::Failure { device_id: 4, reason, .. } => {
                assert!(!reason.is_empty());
                assert_ne!(reason, API_CALL_FAILED);
            }
            FetchOutcome::Success { device_id: 1, .. } => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(report.outcomes.len(), 3);
}

#[tokio::test]
async fn test_directory_failure_yields_no_endpoints() {
    let stub = StubServer::start(
        Upstream::with_devices(&[(1, "HCM-Q1-POP-001")]).directory_status(503),
    )
    .await;
    let http = client(TOKEN);
    let directory = DirectoryClient::new(http.clone(), stub.base_url.clone(), Source::Ipms);

    assert!(directory.list_devices().await.is_empty());

    // A limit is not checked against an unavailable directory
    let endpoints = directory
        .resolve(window(), Mode::Temp, DeviceLimit::First(10))
        .await
        .unwrap();
    assert!(endpoints.is_empty());

    let report = fetcher(http).fetch_all(endpoints).await;
    assert_eq!(report.dispatched, 0);
    assert!(report.outcomes.is_empty());
    assert_eq!(stub.upstream.hits(), 0);
}

#[tokio::test]
async fn test_limit_larger_than_directory_is_rejected() {
    let stub = StubServer::start(Upstream::with_devices(&[
        (1, "HCM-Q1-POP-001"),
        (2, "HCM-Q1-POP-002"),
    ]))
    .await;
    let http = client(TOKEN);
    let directory = DirectoryClient::new(http, stub.base_url.clone(), Source::Opms);

    let result = directory
        .resolve(window(), Mode::Ac, DeviceLimit::First(3))
        .await;
    assert!(matches!(result, Err(FetcherError::InvalidArgument(_))));

    let endpoints = directory
        .resolve(window(), Mode::Ac, DeviceLimit::First(1))
        .await
        .unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].device_id, 1);
    assert!(endpoints[0].url.contains("/opms/pis/1/log/air-cond?"));
    assert!(endpoints[0]
        .url
        .ends_with(&format!("tsdatesta={}&tsdateend={}", DAY_START, DAY_START + 86_400)));
}

#[tokio::test]
async fn test_access_token_header_is_sent() {
    let stub = StubServer::start(
        Upstream::with_devices(&[(1, "HCM-Q1-POP-001")])
            .reply(1, Reply::Samples(fan_samples(&[30.0]))),
    )
    .await;

    let wrong = client("not-the-token");
    let directory = DirectoryClient::new(wrong, stub.base_url.clone(), Source::Opms);
    assert!(directory.list_devices().await.is_empty());
    assert_eq!(stub.upstream.unauthorized(), 1);

    let right = client(TOKEN);
    let directory = DirectoryClient::new(right.clone(), stub.base_url.clone(), Source::Opms);
    let endpoints = directory
        .resolve(window(), Mode::Fan, DeviceLimit::Unbounded)
        .await
        .unwrap();
    let report = fetcher(right).fetch_all(endpoints).await;

    assert_eq!(report.successes(), 1);
    assert_eq!(stub.upstream.unauthorized(), 1);
}

#[tokio::test]
async fn test_in_flight_cap_keeps_every_outcome() {
    let devices: Vec<(i64, String)> = (1..=12).map(|id| (id, format!("POP-{id:04}"))).collect();
    let refs: Vec<(i64, &str)> = devices.iter().map(|(id, n)| (*id, n.as_str())).collect();
    let stub = StubServer::start(Upstream::with_devices(&refs)).await;

    let http = client(TOKEN);
    let directory = DirectoryClient::new(http.clone(), stub.base_url.clone(), Source::Ipms);
    let endpoints = directory
        .resolve(window(), Mode::Ac, DeviceLimit::Unbounded)
        .await
        .unwrap();

    let report = BatchFetcher::new(
        http,
        profile(Source::Ipms, Mode::Ac).reducer,
        50,
        Duration::from_millis(10),
    )
    .with_max_in_flight(Some(3))
    .fetch_all(endpoints)
    .await;

    assert_eq!(report.dispatched, 12);
    assert_eq!(report.successes(), 12);
    assert_eq!(report.cooldowns, 0);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.site().starts_with("POP-")));
}

#[tokio::test]
async fn test_current_mode_reports_not_supported() {
    let stub = StubServer::start(Upstream::with_devices(&[(9, "IPMS-SITE-9")])).await;
    let http = client(TOKEN);
    let directory = DirectoryClient::new(http.clone(), stub.base_url.clone(), Source::Ipms);
    let endpoints = directory
        .resolve(window(), Mode::Current, DeviceLimit::Unbounded)
        .await
        .unwrap();
    assert!(endpoints[0].url.contains("/pis/9/log/device/7?lineid=7&regIds=0&"));

    let report = BatchFetcher::new(
        http,
        profile(Source::Ipms, Mode::Current).reducer,
        50,
        Duration::ZERO,
    )
    .fetch_all(endpoints)
    .await;

    assert_eq!(report.failures(), 1);
    match &report.outcomes[0] {
        FetchOutcome::Failure { site, reason, .. } => {
            assert_eq!(site, "IPMS-SITE-9");
            assert!(reason.contains("not yet supported"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
