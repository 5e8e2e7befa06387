//! DeviceClient against the in-process mock device.

use hygro_core::CONFIG_PATH;
use hygro_test_utils::{fixtures, MockDevice, StatusCode};
use hygro_tui::api_client::{DeviceClient, ProgressFn, TransferProgress};
use reqwest::Method;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn client_for(device: &MockDevice) -> DeviceClient {
    DeviceClient::with_base_url(&device.base_url(), Duration::from_secs(5)).unwrap()
}

fn recorder() -> (ProgressFn, Arc<Mutex<Vec<TransferProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let report: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));
    (report, seen)
}

#[tokio::test]
async fn get_returns_body_on_200() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let client = client_for(&device);

    let body = client.get(CONFIG_PATH).await.unwrap();
    assert!(body.contains("\"ifx_db\":\"climate\""));
}

#[tokio::test]
async fn get_returns_none_on_404_and_on_unreachable_host() {
    let device = MockDevice::start().await.unwrap();
    let client = client_for(&device);
    assert!(client.get("/missing").await.is_none());

    let dead = DeviceClient::with_base_url("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    assert!(dead.get(CONFIG_PATH).await.is_none());
    assert!(!dead.delete("/anything").await);
}

#[tokio::test]
async fn get_binary_reports_download_progress() {
    let device = MockDevice::start().await.unwrap();
    let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    device.insert_blob("/files/blob.bin", payload.clone());
    let client = client_for(&device);
    let (report, seen) = recorder();

    let body = client.get_binary("/files/blob.bin", Some(report)).await.unwrap();
    assert_eq!(body, payload);

    let seen = seen.lock().unwrap();
    let last = seen.last().copied().unwrap();
    assert_eq!(last.loaded, payload.len() as u64);
    assert_eq!(last.total, Some(payload.len() as u64));
    assert!(seen.windows(2).all(|w| w[0].loaded <= w[1].loaded));
}

#[tokio::test]
async fn put_uploads_with_progress() {
    let device = MockDevice::start().await.unwrap();
    let client = client_for(&device);
    let (report, seen) = recorder();
    let payload = vec![7u8; 10_000];

    assert!(client.put("/files/up.bin", payload.clone(), Some(report)).await);
    assert_eq!(device.blob("/files/up.bin"), Some(payload));
    let last = seen.lock().unwrap().last().copied().unwrap();
    assert_eq!(last, TransferProgress { loaded: 10_000, total: Some(10_000) });
}

#[tokio::test]
async fn send_bytes_honours_method() {
    let device = MockDevice::start().await.unwrap();
    let client = client_for(&device);

    assert!(client.send_bytes(Method::POST, "/files/p", b"abc".to_vec(), None).await);
    assert_eq!(device.requests(), vec!["POST /files/p".to_string()]);
    assert_eq!(device.blob("/files/p"), Some(b"abc".to_vec()));
}

#[tokio::test]
async fn delete_succeeds_only_when_resource_exists() {
    let device = MockDevice::start().await.unwrap();
    device.insert_blob("/files/x", vec![1]);
    let client = client_for(&device);

    assert!(client.delete("/files/x").await);
    assert!(!client.delete("/files/x").await);
}

#[tokio::test]
async fn non_200_statuses_are_failures() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    device.fail_with(Some(StatusCode::SERVICE_UNAVAILABLE));
    let client = client_for(&device);

    assert!(client.get(CONFIG_PATH).await.is_none());
    assert!(client.fetch_config().await.is_none());
    assert!(!client.put("/files/a", vec![1, 2], None).await);
}

#[tokio::test]
async fn absolute_urls_bypass_base() {
    let device = MockDevice::start().await.unwrap();
    device.insert_blob("/files/abs", b"hello".to_vec());
    let client = DeviceClient::with_base_url("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();

    let body = client.get(&device.url("/files/abs")).await.unwrap();
    assert_eq!(body, "hello");
}

#[tokio::test]
async fn config_round_trip_through_device() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let client = client_for(&device);

    let mut config = client.fetch_config().await.unwrap();
    assert_eq!(config, fixtures::sample_config());

    config.rename_sensor(1, "loft").unwrap();
    config.set_interval(120);
    assert!(client.store_config(&config).await);

    let stored = device.config();
    assert_eq!(stored.ifx_clients[1].name, "loft");
    assert_eq!(stored.ifx_int, 120);
    // Storing resets readings on the device.
    assert_eq!(stored.ifx_clients[0].reading(), None);
}

#[tokio::test]
async fn fetch_document_keeps_served_text() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let client = client_for(&device);

    let doc = client.fetch_document().await.unwrap();
    assert_eq!(doc.config, fixtures::sample_config());
    assert!(doc.raw.contains("\"t\":null"));
}

#[tokio::test]
async fn device_rejects_oversized_fields() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let client = client_for(&device);

    let mut config = fixtures::sample_config();
    config.ifx_db = "x".repeat(20);
    assert!(!client.store_config(&config).await);
    assert_eq!(device.config().ifx_db, "climate");
}
