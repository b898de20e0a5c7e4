//! In-process stand-in for the telemetry API
//!
//! Serves the device directory and the per-device log endpoints of both
//! families on an ephemeral port. Replies are configured per device id and,
//! optionally, per sub-window start.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pop_telemetry::fetcher::http::TelemetryHttpClient;
use pop_telemetry::fetcher::StaticToken;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TOKEN: &str = "stub-token";

/// What a log endpoint answers
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with inner success and these samples
    Samples(Value),
    /// 200 with inner success=false
    ApiFailure,
    /// Bare status, no envelope
    Status(u16),
    /// 200 with a body that is not JSON
    Malformed,
}

#[derive(Debug, Default)]
pub struct Upstream {
    pub devices: Vec<(i64, String)>,
    pub directory_status: Option<u16>,
    pub by_device: HashMap<i64, Reply>,
    pub by_window_start: HashMap<i64, Reply>,
    pub hits: AtomicUsize,
    pub unauthorized: AtomicUsize,
}

impl Upstream {
    pub fn with_devices(devices: &[(i64, &str)]) -> Self {
        Self {
            devices: devices.iter().map(|(id, n)| (*id, n.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn reply(mut self, device_id: i64, reply: Reply) -> Self {
        self.by_device.insert(device_id, reply);
        self
    }

    pub fn reply_for_window(mut self, start: i64, reply: Reply) -> Self {
        self.by_window_start.insert(start, reply);
        self
    }

    pub fn directory_status(mut self, status: u16) -> Self {
        self.directory_status = Some(status);
        self
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn unauthorized(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }
}

/// Running stub and the base URL to point clients at
pub struct StubServer {
    pub base_url: String,
    pub upstream: Arc<Upstream>,
}

impl StubServer {
    pub async fn start(upstream: Upstream) -> Self {
        let upstream = Arc::new(upstream);
        let app = Router::new()
            .route("/opms/pis", get(directory))
            .route("/pis", get(directory))
            .route("/opms/pis/{id}/log/{kind}", get(samples))
            .route("/pis/{id}/log/{kind}", get(samples))
            .route("/opms/pis/{id}/log/device/{line}", get(device_line))
            .route("/pis/{id}/log/device/{line}", get(device_line))
            .with_state(upstream.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            upstream,
        }
    }
}

/// Client with its own connection pool, bound to the calling test's runtime
pub fn client(token: &str) -> TelemetryHttpClient {
    TelemetryHttpClient::new(
        Arc::new(reqwest::Client::new()),
        Arc::new(StaticToken::new(token)),
    )
}

/// FAN samples where every channel runs at full control with the given speeds
pub fn fan_samples(speeds: &[f64]) -> Value {
    let rows: Vec<Value> = speeds
        .iter()
        .map(|rps| {
            json!({
                "control_fan_pop_0": 100, "rps_fan_pop_0": rps,
                "control_fan_pop_1": 100, "rps_fan_pop_1": rps,
                "control_fan_pop_2": 100, "rps_fan_pop_2": rps,
                "control_fan_pop_3": 100, "rps_fan_pop_3": rps,
            })
        })
        .collect();
    Value::Array(rows)
}

fn authorized(upstream: &Upstream, headers: &HeaderMap) -> bool {
    let ok = headers
        .get("x-access-token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == TOKEN);
    if !ok {
        upstream.unauthorized.fetch_add(1, Ordering::SeqCst);
    }
    ok
}

async fn directory(State(upstream): State<Arc<Upstream>>, headers: HeaderMap) -> Response {
    if !authorized(&upstream, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if let Some(status) = upstream.directory_status {
        return status_only(status);
    }
    let data: Vec<Value> = upstream
        .devices
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
    Json(json!({ "data": data })).into_response()
}

async fn samples(
    State(upstream): State<Arc<Upstream>>,
    Path((id, _kind)): Path<(i64, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    answer(&upstream, id, &query, &headers)
}

async fn device_line(
    State(upstream): State<Arc<Upstream>>,
    Path((id, _line)): Path<(i64, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    answer(&upstream, id, &query, &headers)
}

fn answer(
    upstream: &Upstream,
    id: i64,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Response {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(upstream, headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let window_start = query.get("tsdatesta").and_then(|s| s.parse::<i64>().ok());
    let reply = window_start
        .and_then(|start| upstream.by_window_start.get(&start))
        .or_else(|| upstream.by_device.get(&id))
        .cloned()
        .unwrap_or(Reply::Samples(json!([])));

    match reply {
        Reply::Samples(data) => Json(json!({
            "data": { "data": data, "success": true },
            "success": true
        }))
        .into_response(),
        Reply::ApiFailure => Json(json!({
            "data": { "data": null, "success": false },
            "success": true
        }))
        .into_response(),
        Reply::Status(status) => status_only(status),
        Reply::Malformed => (StatusCode::OK, "<html>gateway</html>").into_response(),
    }
}

fn status_only(status: u16) -> Response {
    StatusCode::from_u16(status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}
