//! End-to-end flows: App event handling, background jobs and the mock device.

use hygro_core::Severity;
use hygro_test_utils::{fixtures, MockDevice, StatusCode};
use hygro_tui::api_client::DeviceClient;
use hygro_tui::config::{ThemeConfig, TuiConfig};
use hygro_tui::events::TuiEvent;
use hygro_tui::jobs::Job;
use hygro_tui::state::App;
use std::time::Duration;
use tokio::sync::mpsc;

fn app_for(device: &MockDevice) -> (App, mpsc::Receiver<TuiEvent>) {
    let config = TuiConfig {
        device_url: device.base_url(),
        request_timeout_ms: 5_000,
        refresh_interval_ms: 1_000,
        persistence_path: "tmp/hygro-tui.json".into(),
        log_path: "tmp/hygro-tui.log".into(),
        theme: ThemeConfig {
            name: "synthbrute".to_string(),
        },
    };
    let client = DeviceClient::new(&config).unwrap();
    let (tx, rx) = mpsc::channel(256);
    (App::new(config, client, tx), rx)
}

/// Feed events to the app until `done` holds.
async fn pump_until<F>(app: &mut App, rx: &mut mpsc::Receiver<TuiEvent>, done: F)
where
    F: Fn(&App) -> bool,
{
    while !done(app) {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed");
        app.handle_event(event);
    }
}

async fn pump_jobs(app: &mut App, rx: &mut mpsc::Receiver<TuiEvent>) {
    pump_until(app, rx, |app| app.running_jobs() == 0).await;
}

async fn loaded_app(device: &MockDevice) -> (App, mpsc::Receiver<TuiEvent>) {
    let (mut app, mut rx) = app_for(device);
    app.start(Job::Reload);
    assert_eq!(app.status().severity(), Severity::Busy);
    pump_jobs(&mut app, &mut rx).await;
    (app, rx)
}

#[tokio::test]
async fn reload_then_save_edits() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let (mut app, mut rx) = loaded_app(&device).await;

    assert_eq!(app.status().text(), "Configuration loaded (2 sensors)");
    assert!(app.device.raw.contains("climate"));
    assert!(app.device.online);

    app.run_command_line("rename 2 loft");
    app.run_command_line("prefix site=cabin");
    assert!(app.device.dirty);
    app.run_command_line("save");
    assert_eq!(app.status().severity(), Severity::Busy);
    pump_jobs(&mut app, &mut rx).await;

    assert_eq!(app.status().text(), "Saved");
    assert_eq!(app.status().severity(), Severity::Ok);
    assert!(!app.device.dirty);
    let stored = device.config();
    assert_eq!(stored.ifx_clients[1].name, "loft");
    assert_eq!(stored.ifx_pfx, "site=cabin");
}

#[tokio::test]
async fn failed_reload_shows_error() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    device.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR));
    let (app, _rx) = loaded_app(&device).await;

    assert_eq!(app.status().severity(), Severity::Err);
    assert!(app.status().text().starts_with("Loading configuration failed"));
    assert!(app.device.config.is_none());
}

#[tokio::test]
async fn export_then_import_file() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let (mut app, mut rx) = loaded_app(&device).await;
    let dir = tempfile::tempdir().unwrap();

    let backup = dir.path().join("backup.json");
    app.run_command_line(&format!("export {}", backup.display()));
    pump_jobs(&mut app, &mut rx).await;
    assert_eq!(app.status().severity(), Severity::Ok);
    let exported = std::fs::read_to_string(&backup).unwrap();
    assert!(exported.contains("\"ifx_db\":\"climate\""));

    let upload = dir.path().join("upload.json");
    std::fs::write(&upload, r#"{"ifx_db":"imported"}"#).unwrap();
    app.run_command_line(&format!("import {}", upload.display()));
    pump_jobs(&mut app, &mut rx).await;
    assert!(app.status().text().starts_with("Imported 21 bytes"));

    // The import triggers a quiet refresh of the local copy.
    pump_until(&mut app, &mut rx, |app| {
        app.device
            .config
            .as_ref()
            .is_some_and(|c| c.ifx_db == "imported")
    })
    .await;
    assert_eq!(device.config().ifx_db, "imported");
    // A document without a sensor list clears it on the device.
    assert!(app.sensors().is_empty());
}

#[tokio::test]
async fn import_of_missing_file_fails() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let (mut app, mut rx) = loaded_app(&device).await;

    app.run_command_line("import /definitely/not/here.json");
    pump_jobs(&mut app, &mut rx).await;
    assert_eq!(app.status().severity(), Severity::Err);
    assert!(app.status().text().contains("cannot read"));
}

#[tokio::test]
async fn delete_command_removes_resource() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    device.insert_blob("/files/old.log", b"old".to_vec());
    let (mut app, mut rx) = loaded_app(&device).await;

    app.run_command_line("delete /files/old.log");
    pump_jobs(&mut app, &mut rx).await;
    assert_eq!(app.status().text(), "Deleted /files/old.log");
    assert!(device.blob("/files/old.log").is_none());

    app.run_command_line("delete /files/old.log");
    pump_jobs(&mut app, &mut rx).await;
    assert_eq!(app.status().severity(), Severity::Err);
}

#[tokio::test]
async fn tick_polls_fresh_readings() {
    let device = MockDevice::with_config(fixtures::sample_config()).await.unwrap();
    let (mut app, mut rx) = loaded_app(&device).await;
    let status_before = app.status().clone();

    assert!(device.set_reading(fixtures::attic_addr(), 14.5, 62.0));
    app.handle_event(TuiEvent::Tick);
    pump_until(&mut app, &mut rx, |app| app.sensors()[1].reading().is_some()).await;

    assert_eq!(app.sensors()[1].reading(), Some((14.5, 62.0)));
    // Polling never touches the status line.
    assert_eq!(app.status(), &status_before);
}
