//! Binary-level tests for the `report` and `long-range` commands

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

use super::stub::{fan_samples, Reply, StubServer, Upstream, TOKEN};

fn pop_telemetry() -> Command {
    let mut cmd = Command::cargo_bin("pop-telemetry").unwrap();
    cmd.env_remove("SMARTPOP_TOKEN")
        .env_remove("SMARTPOP_BASE_URL")
        .env("RUST_LOG", "pop_telemetry=warn");
    cmd
}

/// Run the binary off the async runtime so the stub keeps serving
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || pop_telemetry().args(&args).output().unwrap())
        .await
        .unwrap()
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_report_command_writes_csv_and_summary() {
    let stub = StubServer::start(
        Upstream::with_devices(&[
            (11, "HCM-Q1-POP-011"),
            (12, "HCM-Q1-POP-012"),
            (13, "HCM-Q1-POP-013"),
        ])
        .reply(11, Reply::Samples(fan_samples(&[70.0, 80.0])))
        .reply(12, Reply::Status(404))
        .reply(13, Reply::ApiFailure),
    )
    .await;
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("fan_speeds.csv");

    let result = run(vec![
        "--token".into(),
        TOKEN.into(),
        "--base-url".into(),
        stub.base_url.clone(),
        "--output-format".into(),
        "json".into(),
        "report".into(),
        "--source".into(),
        "opms".into(),
        "--mode".into(),
        "FAN".into(),
        "--start".into(),
        "2025-03-09".into(),
        "--end".into(),
        "2025-03-09".into(),
        "--cooldown".into(),
        "0".into(),
        "--output".into(),
        output.to_str().unwrap().into(),
    ])
    .await;
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let summary: Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(summary["command"], "report");
    assert_eq!(summary["start"], 1_741_478_400);
    assert_eq!(summary["end"], 1_741_564_800);
    assert_eq!(summary["endpoints"], 3);
    assert_eq!(summary["successes"], 1);
    assert_eq!(summary["failures"], 1);
    assert_eq!(summary["dropped"], 1);
    assert_eq!(summary["panicked"], 0);
    assert_eq!(summary["rows_written"], 2);

    let content = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "PI ID,POP,Status,F1,F2,F3,F4");
    assert!(lines.contains(&"11,HCM-Q1-,success,75.00,75.00,75.00,75.00"));
    assert!(lines.contains(&"13,HCM-Q1-,error,,API call failed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_long_range_command_defaults_to_utf16_for_ipms() {
    let stub = StubServer::start(Upstream::default().reply(
        7,
        Reply::Samples(serde_json::json!([{ "sensoripmst0": 25 }])),
    ))
    .await;
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("ipms_7_TEMP.csv");

    let result = run(vec![
        "--token".into(),
        TOKEN.into(),
        "--base-url".into(),
        stub.base_url.clone(),
        "long-range".into(),
        "--source".into(),
        "ipms".into(),
        "--mode".into(),
        "TEMP".into(),
        "--device-id".into(),
        "7".into(),
        "--start".into(),
        "0".into(),
        "--end".into(),
        "57600".into(),
        "--cooldown".into(),
        "0".into(),
        "--output".into(),
        output.to_str().unwrap().into(),
    ])
    .await;
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
    let text = decode_utf16le(&bytes[2..]);
    assert_eq!(
        text,
        "PI ID,POP,Status,T1 Min,T1 Max,T1 Avg\n7,SINGLE_POP,success,50.00,50.00,50.00\n"
    );
    assert_eq!(stub.upstream.hits(), 2);
}

#[test]
fn test_invalid_mode_fails() {
    pop_telemetry()
        .args([
            "--token",
            TOKEN,
            "report",
            "--source",
            "opms",
            "--mode",
            "HUMIDITY",
            "--start",
            "0",
            "--end",
            "1",
        ])
        .assert()
        .failure();
}

#[test]
fn test_missing_token_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("never.csv");

    pop_telemetry()
        .args([
            "--base-url",
            "http://127.0.0.1:9",
            "report",
            "--source",
            "ipms",
            "--mode",
            "AC",
            "--start",
            "0",
            "--end",
            "1",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure();
    assert!(!output.exists());
}

#[test]
fn test_end_before_start_fails() {
    pop_telemetry()
        .args([
            "--token",
            TOKEN,
            "report",
            "--source",
            "opms",
            "--mode",
            "TEMP",
            "--start",
            "2025-03-10",
            "--end",
            "2025-03-01",
        ])
        .assert()
        .failure();
}
