//! In-process mock of the bridge's HTTP configuration API.
//!
//! `/api/conf.json` behaves like the firmware handler: GET returns the
//! configuration with the latest readings, PUT accepts a partial document,
//! validates it field by field against the device buffers, resets readings
//! and answers `OK`. Every other path is an in-memory blob store supporting
//! GET, PUT and DELETE, which lets tests exercise the generic transfer
//! operations of the client.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hygro_core::{
    DeviceConfig, SensorAddr, SensorClient, CONFIG_PATH, DATABASE_MAX, HOST_MAX, MAX_SENSORS,
    PREFIX_MAX, SENSOR_NAME_MAX,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Requests at or above this size are refused by the firmware.
const MAX_CONFIG_BODY: usize = 1024;

#[derive(Debug, Default)]
struct DeviceState {
    config: DeviceConfig,
    blobs: HashMap<String, Vec<u8>>,
    requests: Vec<String>,
    forced_status: Option<StatusCode>,
}

type Shared = Arc<Mutex<DeviceState>>;

fn lock(state: &Shared) -> std::sync::MutexGuard<'_, DeviceState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A running mock device bound to an ephemeral localhost port. The server
/// stops when the value is dropped.
#[derive(Debug)]
pub struct MockDevice {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockDevice {
    pub async fn start() -> std::io::Result<Self> {
        Self::with_config(DeviceConfig::default()).await
    }

    pub async fn with_config(config: DeviceConfig) -> std::io::Result<Self> {
        let state: Shared = Arc::new(Mutex::new(DeviceState {
            config,
            ..DeviceState::default()
        }));
        let app = router(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::warn!(error = %err, "mock device server stopped");
            }
        });
        Ok(Self {
            addr,
            state,
            server,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Current device configuration, readings included.
    pub fn config(&self) -> DeviceConfig {
        lock(&self.state).config.clone()
    }

    /// Simulate a BLE advertisement from a configured sensor. Returns `false`
    /// if the address is not configured.
    pub fn set_reading(&self, addr: SensorAddr, t: f32, h: f32) -> bool {
        let mut state = lock(&self.state);
        match state.config.ifx_clients.iter_mut().find(|c| c.addr == addr) {
            Some(client) => {
                client.t = Some(t);
                client.h = Some(h);
                true
            }
            None => false,
        }
    }

    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).blobs.get(path).cloned()
    }

    pub fn insert_blob(&self, path: impl Into<String>, bytes: Vec<u8>) {
        lock(&self.state).blobs.insert(path.into(), bytes);
    }

    /// Answer every request with `status` until reset with `None`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        lock(&self.state).forced_status = status;
    }

    /// Requests seen so far, as `"METHOD /path"`.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route(CONFIG_PATH, get(get_config).put(put_config))
        .fallback(blob_store)
        .with_state(state)
}

/// Record the request; returns the forced response if one is configured.
fn record(state: &Shared, method: &Method, path: &str) -> Option<Response> {
    let mut state = lock(state);
    state.requests.push(format!("{} {}", method, path));
    state
        .forced_status
        .map(|status| (status, "forced failure").into_response())
}

async fn get_config(State(state): State<Shared>) -> Response {
    if let Some(forced) = record(&state, &Method::GET, CONFIG_PATH) {
        return forced;
    }
    let state = lock(&state);
    Json(config_document(&state.config)).into_response()
}

async fn put_config(State(state): State<Shared>, body: Bytes) -> Response {
    if let Some(forced) = record(&state, &Method::PUT, CONFIG_PATH) {
        return forced;
    }
    if body.len() >= MAX_CONFIG_BODY {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Content too long").into_response();
    }
    let doc: Value = match serde_json::from_slice(&body) {
        Ok(doc) => doc,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response(),
    };

    let mut state = lock(&state);
    match apply_document(&state.config, &doc) {
        Ok(mut config) => {
            config.clear_readings();
            state.config = config;
            (StatusCode::OK, "OK").into_response()
        }
        Err(rejection) => rejection.into_response(),
    }
}

async fn blob_store(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    if let Some(forced) = record(&state, &method, &path) {
        return forced;
    }
    let mut state = lock(&state);
    match method {
        Method::GET => match state.blobs.get(&path) {
            Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        Method::PUT | Method::POST => {
            state.blobs.insert(path, body.to_vec());
            (StatusCode::OK, "OK").into_response()
        }
        Method::DELETE => match state.blobs.remove(&path) {
            Some(_) => (StatusCode::OK, "OK").into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn config_document(config: &DeviceConfig) -> Value {
    let clients: Vec<Value> = config
        .ifx_clients
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "addr": c.addr.to_string(),
                "t": c.t,
                "h": c.h,
            })
        })
        .collect();
    json!({
        "ifx_host": config.ifx_host,
        "ifx_db": config.ifx_db,
        "ifx_pfx": config.ifx_pfx,
        "ifx_int": config.ifx_int,
        "ifx_clients": clients,
    })
}

type Rejection = (StatusCode, String);

fn invalid_field(name: &str) -> Rejection {
    (StatusCode::BAD_REQUEST, format!("Invalid field {}", name))
}

/// Optional string field; absent keeps `current`.
fn string_field(doc: &Value, name: &str, max: usize, current: &str) -> Result<String, Rejection> {
    match doc.get(name) {
        None => Ok(current.to_string()),
        Some(Value::String(s)) if s.len() <= max => Ok(s.clone()),
        Some(_) => Err(invalid_field(name)),
    }
}

/// Apply a PUT document on top of `current`. Fields that are absent keep
/// their value, except the sensor list: a missing `ifx_clients` empties it,
/// and a sensor entry missing `name` or `addr` inherits them from the slot
/// it replaces.
fn apply_document(current: &DeviceConfig, doc: &Value) -> Result<DeviceConfig, Rejection> {
    let mut next = current.clone();
    next.ifx_host = string_field(doc, "ifx_host", HOST_MAX, &current.ifx_host)?;
    next.ifx_db = string_field(doc, "ifx_db", DATABASE_MAX, &current.ifx_db)?;
    next.ifx_pfx = string_field(doc, "ifx_pfx", PREFIX_MAX, &current.ifx_pfx)?;

    if let Some(interval) = doc.get("ifx_int") {
        let value = interval.as_f64().ok_or_else(|| invalid_field("ifx_int"))? as i64;
        next.ifx_int = u16::try_from(value).map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Interval out of range".to_string(),
            )
        })?;
    }

    let mut clients = Vec::new();
    if let Some(list) = doc.get("ifx_clients") {
        let list = list
            .as_array()
            .ok_or_else(|| invalid_field("clients"))?;
        if list.len() > MAX_SENSORS {
            return Err((StatusCode::BAD_REQUEST, "Too many clients".to_string()));
        }
        for (slot, entry) in list.iter().enumerate() {
            let previous = current.ifx_clients.get(slot);
            let name = string_field(
                entry,
                "name",
                SENSOR_NAME_MAX,
                previous.map(|p| p.name.as_str()).unwrap_or(""),
            )?;
            let addr = match entry.get("addr") {
                None => previous.map(|p| p.addr),
                Some(Value::String(s)) => Some(s.parse::<SensorAddr>().map_err(|_| invalid_field("addr"))?),
                Some(_) => return Err(invalid_field("addr")),
            };
            if let Some(addr) = addr {
                clients.push(SensorClient::new(name, addr));
            }
        }
    }
    next.ifx_clients = clients;
    Ok(next)
}
