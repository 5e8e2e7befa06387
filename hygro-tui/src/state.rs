//! Application state and event handling.

use crate::api_client::{DeviceClient, TransferProgress};
use crate::commands::{self, Command};
use crate::config::TuiConfig;
use crate::events::TuiEvent;
use crate::jobs::{self, Job, JobEvent, JobOutcome};
use crate::keys::{map_key, Action};
use crate::nav::View;
use crate::notifications::{app_notifier, AppNotifier, StatusLine};
use crate::persistence::PersistedState;
use crate::theme::SynthBruteTheme;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use hygro_core::{DeviceConfig, HygroResult, SensorAddr, SensorClient};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Default)]
pub struct CommandPalette {
    pub input: String,
}

/// Local copy of the device configuration.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub config: Option<DeviceConfig>,
    /// Document as last received from the device.
    pub raw: String,
    /// Local edits not yet stored on the device.
    pub dirty: bool,
    /// Whether the last request to the device succeeded.
    pub online: bool,
    /// Bumped by every local edit. A save only clears `dirty` if no edit
    /// happened after it was sent.
    pub revision: u64,
}

pub struct App {
    pub config: TuiConfig,
    pub theme: SynthBruteTheme,
    pub client: DeviceClient,
    pub notifier: AppNotifier,
    pub active_view: View,
    pub device: DeviceState,
    /// Index into the sensor list.
    pub selected: Option<usize>,
    pub command_palette: Option<CommandPalette>,
    pub help_visible: bool,
    pub transfer: Option<TransferProgress>,

    running_jobs: usize,
    poll_in_flight: bool,
    quit_armed: bool,
    restore_selection: Option<SensorAddr>,
    /// Bumped whenever the local copy is synced with the device. Polls
    /// started under an older generation are dropped.
    generation: u64,
    events: mpsc::Sender<TuiEvent>,
}

impl App {
    /// Must be called inside a tokio runtime; status timers and jobs are
    /// spawned onto it and report back through `events`.
    pub fn new(config: TuiConfig, client: DeviceClient, events: mpsc::Sender<TuiEvent>) -> Self {
        Self {
            config,
            theme: SynthBruteTheme::synthbrute(),
            client,
            notifier: app_notifier(events.clone()),
            active_view: View::default(),
            device: DeviceState::default(),
            selected: None,
            command_palette: None,
            help_visible: false,
            transfer: None,
            running_jobs: 0,
            poll_in_flight: false,
            quit_armed: false,
            restore_selection: None,
            generation: 0,
            events,
        }
    }

    pub fn restore(&mut self, state: PersistedState) {
        self.active_view = state.active_view;
        self.restore_selection = state.selected_sensor;
        self.apply_restored_selection();
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            active_view: self.active_view,
            selected_sensor: self
                .selected_sensor()
                .map(|s| s.addr)
                .or(self.restore_selection),
        }
    }

    pub fn status(&self) -> &StatusLine {
        self.notifier.display()
    }

    /// Jobs that show progress on the status line.
    pub fn running_jobs(&self) -> usize {
        self.running_jobs
    }

    pub fn sensors(&self) -> &[SensorClient] {
        self.device
            .config
            .as_ref()
            .map(|c| c.ifx_clients.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_sensor(&self) -> Option<&SensorClient> {
        self.selected.and_then(|i| self.sensors().get(i))
    }

    /// Returns `true` when the app should exit.
    pub fn handle_event(&mut self, event: TuiEvent) -> bool {
        match event {
            TuiEvent::Input(key) => return self.handle_key(key),
            TuiEvent::Tick => self.poll_readings(),
            TuiEvent::AutoClear(ticket) => {
                self.notifier.on_auto_clear(ticket);
            }
            TuiEvent::Job(event) => self.on_job_event(event),
            TuiEvent::Resize { .. } => {}
        }
        false
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        if self.command_palette.is_some() {
            self.palette_key(key);
            return false;
        }
        match map_key(key) {
            Some(action) => self.apply_action(action),
            None => false,
        }
    }

    pub fn apply_action(&mut self, action: Action) -> bool {
        if action != Action::Quit {
            self.quit_armed = false;
        }
        match action {
            Action::Quit => return self.request_quit(),
            Action::NextView => self.active_view = self.active_view.next(),
            Action::PrevView => self.active_view = self.active_view.previous(),
            Action::SwitchView(index) => {
                if let Some(view) = View::from_index(index) {
                    self.active_view = view;
                }
            }
            Action::MoveDown => self.selected = select_next_index(self.sensors().len(), self.selected),
            Action::MoveUp => self.selected = select_prev_index(self.sensors().len(), self.selected),
            Action::RemoveSensor => match self.selected {
                Some(index) => self.execute(Command::Remove(index)),
                None => self.notifier.notify_warn("No sensor selected"),
            },
            Action::Save => self.execute(Command::Save),
            Action::Reload => self.execute(Command::Reload),
            Action::OpenHelp => self.help_visible = !self.help_visible,
            Action::OpenCommand => {
                self.help_visible = false;
                self.command_palette = Some(CommandPalette::default());
            }
            Action::Cancel => {
                if self.help_visible {
                    self.help_visible = false;
                } else {
                    self.notifier.clear_status();
                }
            }
        }
        false
    }

    /// Parse and run one command palette line.
    pub fn run_command_line(&mut self, line: &str) {
        match commands::parse(line) {
            Ok(command) => self.execute(command),
            Err(err) => self.notifier.notify_err(err.to_string()),
        }
    }

    pub fn execute(&mut self, command: Command) {
        match command {
            Command::Host(host) => {
                self.edit(|c| c.set_host(host), "InfluxDB host updated");
            }
            Command::Database(db) => {
                self.edit(|c| c.set_database(db), "Measurement updated");
            }
            Command::Prefix(prefix) => {
                self.edit(|c| c.set_prefix(prefix), "Tag prefix updated");
            }
            Command::Interval(seconds) => {
                let done = format!("Interval set to {}s", seconds);
                self.edit(
                    |c| {
                        c.set_interval(seconds);
                        Ok(())
                    },
                    done,
                );
            }
            Command::Add { addr, name } => {
                let done = format!("Added {}", name);
                if self.edit(|c| c.add_sensor(addr, name).map(|_| ()), done) {
                    self.selected = self.sensors().len().checked_sub(1);
                }
            }
            Command::Rename { index, name } => {
                let done = format!("Sensor {} renamed to {}", index + 1, name);
                self.edit(|c| c.rename_sensor(index, name), done);
            }
            Command::Remove(index) => {
                let name = self.sensors().get(index).map(|s| s.name.clone());
                let done = format!("Removed {}", name.unwrap_or_default());
                self.edit(|c| c.remove_sensor(index).map(|_| ()), done);
            }
            Command::Save => self.save(),
            Command::Reload => self.start(Job::Reload),
            Command::Export(path) => self.start(Job::Export(path)),
            Command::Import(path) => self.start(Job::Import(path)),
            Command::Delete(url) => self.start(Job::Delete(url)),
            Command::Clear => self.notifier.clear_status(),
        }
    }

    /// Spawn a device job. Non-quiet jobs show a BUSY status until they
    /// finish.
    pub fn start(&mut self, job: Job) {
        if job.is_quiet() {
            self.poll_in_flight = true;
        } else {
            self.running_jobs += 1;
            self.transfer = None;
            self.notifier.notify_busy(format!("{}...", job.label()));
        }
        jobs::spawn(self.client.clone(), job, self.events.clone());
    }

    pub fn on_job_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::Progress(progress) => self.transfer = Some(progress),
            JobEvent::Finished { job, outcome } => self.finish(job, outcome),
        }
    }

    fn finish(&mut self, job: Job, outcome: JobOutcome) {
        let quiet = job.is_quiet();
        if quiet {
            self.poll_in_flight = false;
        } else {
            self.running_jobs = self.running_jobs.saturating_sub(1);
            if self.running_jobs == 0 {
                self.transfer = None;
            }
        }

        match outcome {
            JobOutcome::Loaded { config, raw } => {
                self.device.online = true;
                if let Job::Poll { generation } = &job {
                    if *generation != self.generation {
                        tracing::debug!(
                            poll = *generation,
                            current = self.generation,
                            "dropping poll started before the last sync"
                        );
                        return;
                    }
                }
                self.device.raw = raw;
                if quiet && self.device.dirty {
                    if let Some(local) = self.device.config.as_mut() {
                        merge_readings(local, &config);
                    }
                } else {
                    let count = config.ifx_clients.len();
                    self.device.config = Some(config);
                    self.device.dirty = false;
                    self.apply_restored_selection();
                    self.clamp_selection();
                    if !quiet {
                        self.generation += 1;
                        self.notifier
                            .notify_ok(format!("Configuration loaded ({} sensors)", count));
                    }
                }
            }
            JobOutcome::Saved => {
                self.device.online = true;
                self.generation += 1;
                // The device forgets readings when a configuration is stored.
                if let Some(config) = self.device.config.as_mut() {
                    config.clear_readings();
                }
                let current = matches!(
                    &job,
                    Job::Save { revision, .. } if *revision == self.device.revision
                );
                if current {
                    self.device.dirty = false;
                    self.notifier.notify_ok("Saved");
                } else {
                    self.notifier
                        .notify_warn("Saved, but later edits are unsaved (press s)");
                }
            }
            JobOutcome::Exported { path, bytes } => {
                self.notifier
                    .notify_ok(format!("Exported {} bytes to {}", bytes, path.display()));
            }
            JobOutcome::Imported { path, bytes } => {
                self.device.dirty = false;
                self.notifier
                    .notify_ok(format!("Imported {} bytes from {}", bytes, path.display()));
                self.generation += 1;
                self.start(Job::Poll {
                    generation: self.generation,
                });
            }
            JobOutcome::Deleted { url } => {
                self.notifier.notify_ok(format!("Deleted {}", url));
            }
            JobOutcome::Failed { reason } => {
                if quiet {
                    if self.device.online {
                        tracing::warn!(%reason, "lost contact with device");
                    }
                    self.device.online = false;
                } else {
                    self.notifier
                        .notify_err(format!("{} failed: {}", job.label(), reason));
                }
            }
        }
    }

    fn poll_readings(&mut self) {
        if self.device.config.is_some() && !self.poll_in_flight && self.running_jobs == 0 {
            self.start(Job::Poll {
                generation: self.generation,
            });
        }
    }

    fn palette_key(&mut self, key: KeyEvent) {
        let Some(palette) = self.command_palette.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.command_palette = None,
            KeyCode::Enter => {
                let line = std::mem::take(&mut palette.input);
                self.command_palette = None;
                self.run_command_line(&line);
            }
            KeyCode::Backspace => {
                palette.input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                palette.input.push(c);
            }
            _ => {}
        }
    }

    fn request_quit(&mut self) -> bool {
        if self.device.dirty && !self.quit_armed {
            self.quit_armed = true;
            self.notifier
                .notify_warn("Unsaved changes: press q again to quit");
            return false;
        }
        true
    }

    fn save(&mut self) {
        let Some(config) = &self.device.config else {
            self.notifier.notify_warn("No configuration loaded (press r)");
            return;
        };
        if let Err(err) = config.validate() {
            self.notifier.notify_err(err.to_string());
            return;
        }
        let job = Job::Save {
            config: config.clone(),
            revision: self.device.revision,
        };
        self.start(job);
    }

    /// Apply a local edit. Returns `true` if it was accepted.
    fn edit<F>(&mut self, apply: F, done: impl Into<String>) -> bool
    where
        F: FnOnce(&mut DeviceConfig) -> HygroResult<()>,
    {
        let Some(config) = self.device.config.as_mut() else {
            self.notifier.notify_warn("No configuration loaded (press r)");
            return false;
        };
        match apply(config) {
            Ok(()) => {
                self.device.dirty = true;
                self.device.revision += 1;
                self.clamp_selection();
                self.notifier
                    .notify_ok(format!("{} (unsaved, press s)", done.into()));
                true
            }
            Err(err) => {
                self.notifier.notify_err(err.to_string());
                false
            }
        }
    }

    fn apply_restored_selection(&mut self) {
        let Some(addr) = self.restore_selection else {
            return;
        };
        if let Some(index) = self.sensors().iter().position(|s| s.addr == addr) {
            self.selected = Some(index);
            self.restore_selection = None;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.sensors().len();
        self.selected = match self.selected {
            _ if len == 0 => None,
            Some(index) if index >= len => Some(len - 1),
            Some(index) => Some(index),
            None => Some(0),
        };
    }
}

/// Copy readings from `fresh` onto matching sensors in `local`.
fn merge_readings(local: &mut DeviceConfig, fresh: &DeviceConfig) {
    for client in &mut local.ifx_clients {
        if let Some(update) = fresh.ifx_clients.iter().find(|f| f.addr == client.addr) {
            client.t = update.t;
            client.h = update.h;
        }
    }
}

fn select_next_index(len: usize, selected: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(index) if index < len => (index + 1) % len,
        _ => 0,
    })
}

fn select_prev_index(len: usize, selected: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(0) | None => len - 1,
        Some(index) => (index - 1).min(len - 1),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeConfig;
    use hygro_core::Severity;
    use hygro_test_utils::fixtures;
    use std::time::Duration;

    fn test_app() -> (App, mpsc::Receiver<TuiEvent>) {
        let config = TuiConfig {
            device_url: "http://127.0.0.1:9".to_string(),
            request_timeout_ms: 500,
            refresh_interval_ms: 1_000,
            persistence_path: "tmp/hygro-tui.json".into(),
            log_path: "tmp/hygro-tui.log".into(),
            theme: ThemeConfig {
                name: "synthbrute".to_string(),
            },
        };
        let client = DeviceClient::with_base_url(&config.device_url, Duration::from_millis(500))
            .unwrap();
        let (tx, rx) = mpsc::channel(64);
        (App::new(config, client, tx), rx)
    }

    fn loaded(app: &mut App) {
        let config = fixtures::sample_config();
        let raw = config.to_json().unwrap();
        app.on_job_event(JobEvent::Finished {
            job: Job::Reload,
            outcome: JobOutcome::Loaded { config, raw },
        });
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_line(app: &mut App, line: &str) {
        app.handle_key(key(KeyCode::Char(':')));
        for c in line.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
    }

    #[tokio::test]
    async fn loaded_outcome_replaces_config_and_reports_ok() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        assert_eq!(app.sensors().len(), 2);
        assert_eq!(app.selected, Some(0));
        assert!(app.device.online);
        assert_eq!(app.status().severity(), Severity::Ok);
        assert_eq!(app.status().text(), "Configuration loaded (2 sensors)");
    }

    #[tokio::test]
    async fn edits_without_config_warn() {
        let (mut app, _rx) = test_app();
        type_line(&mut app, "db weather");
        assert_eq!(app.status().severity(), Severity::Warn);
        assert!(!app.device.dirty);
    }

    #[tokio::test]
    async fn palette_edits_mark_dirty() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        type_line(&mut app, "db weather");
        assert!(app.command_palette.is_none());
        assert!(app.device.dirty);
        assert_eq!(app.device.config.as_ref().unwrap().ifx_db, "weather");
        assert_eq!(app.status().severity(), Severity::Ok);
    }

    #[tokio::test]
    async fn invalid_command_shows_error() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        type_line(&mut app, "db this-name-is-far-too-long");
        assert_eq!(app.status().severity(), Severity::Err);
        assert_eq!(app.device.config.as_ref().unwrap().ifx_db, "climate");

        type_line(&mut app, "frobnicate");
        assert_eq!(app.status().text(), "Unknown command: frobnicate");
    }

    #[tokio::test]
    async fn escape_closes_palette_without_running() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        app.handle_key(key(KeyCode::Char(':')));
        app.handle_key(key(KeyCode::Char('r')));
        app.handle_key(key(KeyCode::Esc));
        assert!(app.command_palette.is_none());
        assert_eq!(app.running_jobs(), 0);
    }

    #[tokio::test]
    async fn remove_key_deletes_selected_sensor() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_sensor().unwrap().name, "attic");
        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(app.sensors().len(), 1);
        assert_eq!(app.selected, Some(0));
        assert_eq!(app.status().text(), "Removed attic (unsaved, press s)");
    }

    #[tokio::test]
    async fn quit_with_unsaved_changes_needs_confirmation() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        type_line(&mut app, "interval 30");
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        assert_eq!(app.status().severity(), Severity::Warn);
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[tokio::test]
    async fn escape_clears_status() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.status().is_visible());
        assert_eq!(app.notifier.pending_clear(), None);
    }

    #[tokio::test]
    async fn quiet_poll_keeps_local_edits() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        type_line(&mut app, "rename 1 galley");

        let mut fresh = fixtures::sample_config();
        fresh.ifx_clients[0].t = Some(23.0);
        fresh.ifx_clients[1].t = Some(12.0);
        fresh.ifx_clients[1].h = Some(70.0);
        let raw = fresh.to_json().unwrap();
        app.on_job_event(JobEvent::Finished {
            job: Job::Poll {
                generation: app.generation,
            },
            outcome: JobOutcome::Loaded { config: fresh, raw },
        });

        let sensors = app.sensors();
        assert_eq!(sensors[0].name, "galley");
        assert_eq!(sensors[0].t, Some(23.0));
        assert_eq!(sensors[1].reading(), Some((12.0, 70.0)));
        assert!(app.device.dirty);
        assert!(app.status().text().starts_with("Sensor 1 renamed"));
    }

    #[tokio::test]
    async fn failed_job_reports_error_and_failed_poll_goes_offline() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        app.on_job_event(JobEvent::Finished {
            job: Job::Delete("/files/a".into()),
            outcome: JobOutcome::Failed {
                reason: "device refused the request".into(),
            },
        });
        assert_eq!(app.status().severity(), Severity::Err);
        assert_eq!(
            app.status().text(),
            "Deleting /files/a failed: device refused the request"
        );

        app.on_job_event(JobEvent::Finished {
            job: Job::Poll { generation: 0 },
            outcome: JobOutcome::Failed {
                reason: "device did not answer".into(),
            },
        });
        assert!(!app.device.online);
        assert_eq!(app.status().severity(), Severity::Err);
    }

    #[tokio::test]
    async fn selection_restores_by_address() {
        let (mut app, _rx) = test_app();
        app.restore(PersistedState {
            active_view: View::Influx,
            selected_sensor: Some(fixtures::attic_addr()),
        });
        assert_eq!(app.active_view, View::Influx);
        assert_eq!(app.persisted().selected_sensor, Some(fixtures::attic_addr()));

        loaded(&mut app);
        assert_eq!(app.selected, Some(1));
    }

    /// The save job `start` just spawned for the current local copy.
    fn sent_save(app: &App) -> Job {
        Job::Save {
            config: app.device.config.clone().unwrap(),
            revision: app.device.revision,
        }
    }

    fn saved(app: &mut App, job: Job) {
        app.on_job_event(JobEvent::Finished {
            job,
            outcome: JobOutcome::Saved,
        });
    }

    #[tokio::test]
    async fn edit_during_save_stays_dirty() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        type_line(&mut app, "db first");
        type_line(&mut app, "save");
        assert_eq!(app.running_jobs(), 1);
        let sent = sent_save(&app);
        type_line(&mut app, "db second");

        saved(&mut app, sent);
        assert_eq!(app.device.config.as_ref().unwrap().ifx_db, "second");
        assert!(app.device.dirty);
        assert_eq!(app.status().severity(), Severity::Warn);
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
    }

    #[tokio::test]
    async fn save_without_later_edits_marks_clean() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        type_line(&mut app, "db first");
        type_line(&mut app, "save");
        let sent = sent_save(&app);

        saved(&mut app, sent);
        assert!(!app.device.dirty);
        assert_eq!(app.status().text(), "Saved");
        assert_eq!(app.sensors()[0].reading(), None);
    }

    #[tokio::test]
    async fn poll_started_before_save_is_dropped() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        let early_poll = Job::Poll {
            generation: app.generation,
        };
        type_line(&mut app, "db fresh");
        type_line(&mut app, "save");
        let sent = sent_save(&app);
        saved(&mut app, sent);
        assert!(!app.device.dirty);

        let before_save = fixtures::sample_config();
        let raw = before_save.to_json().unwrap();
        app.on_job_event(JobEvent::Finished {
            job: early_poll,
            outcome: JobOutcome::Loaded {
                config: before_save,
                raw,
            },
        });
        assert_eq!(app.device.config.as_ref().unwrap().ifx_db, "fresh");

        let mut after_save = fixtures::sample_config();
        after_save.ifx_db = "fresh".to_string();
        after_save.ifx_clients[1].t = Some(15.0);
        after_save.ifx_clients[1].h = Some(55.0);
        let raw = after_save.to_json().unwrap();
        app.on_job_event(JobEvent::Finished {
            job: Job::Poll {
                generation: app.generation,
            },
            outcome: JobOutcome::Loaded {
                config: after_save,
                raw,
            },
        });
        assert_eq!(app.sensors()[1].reading(), Some((15.0, 55.0)));
        assert!(app.device.raw.contains("fresh"));
    }

    #[tokio::test]
    async fn save_rejects_invalid_config_before_sending() {
        let (mut app, _rx) = test_app();
        loaded(&mut app);
        if let Some(config) = app.device.config.as_mut() {
            config.ifx_clients[1].name = "   ".to_string();
        }
        app.handle_key(key(KeyCode::Char('s')));
        assert_eq!(app.running_jobs(), 0);
        assert_eq!(app.status().severity(), Severity::Err);
    }
}
