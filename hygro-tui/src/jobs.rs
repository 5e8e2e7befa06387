//! Background device operations.
//!
//! Each job runs as its own tokio task and reports back through the event
//! channel: zero or more [`JobEvent::Progress`] updates, then exactly one
//! [`JobEvent::Finished`].

use crate::api_client::{DeviceClient, ProgressFn, TransferProgress};
use crate::events::TuiEvent;
use hygro_core::{DeviceConfig, CONFIG_PATH};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Fetch the configuration and replace the local copy.
    Reload,
    /// Background refresh for live readings. Runs without status messages
    /// and keeps unsaved local edits. `generation` is the app's sync
    /// generation when the poll started.
    Poll { generation: u64 },
    /// Store `config`, which is local edit `revision`.
    Save { config: DeviceConfig, revision: u64 },
    Export(PathBuf),
    Import(PathBuf),
    Delete(String),
}

impl Job {
    /// Quiet jobs never touch the status line.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Job::Poll { .. })
    }

    pub fn label(&self) -> String {
        match self {
            Job::Reload => "Loading configuration".to_string(),
            Job::Poll { .. } => "Polling readings".to_string(),
            Job::Save { .. } => "Saving configuration".to_string(),
            Job::Export(path) => format!("Exporting to {}", path.display()),
            Job::Import(path) => format!("Importing {}", path.display()),
            Job::Delete(url) => format!("Deleting {}", url),
        }
    }
}

#[derive(Debug)]
pub enum JobEvent {
    Progress(TransferProgress),
    Finished { job: Job, outcome: JobOutcome },
}

#[derive(Debug, PartialEq)]
pub enum JobOutcome {
    Loaded { config: DeviceConfig, raw: String },
    Saved,
    Exported { path: PathBuf, bytes: usize },
    Imported { path: PathBuf, bytes: usize },
    Deleted { url: String },
    Failed { reason: String },
}

pub fn spawn(client: DeviceClient, job: Job, sender: mpsc::Sender<TuiEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !job.is_quiet() {
            tracing::info!(job = %job.label(), "job started");
        }
        let outcome = run(&client, &job, progress_reporter(sender.clone())).await;
        if let JobOutcome::Failed { reason } = &outcome {
            tracing::info!(job = %job.label(), %reason, "job failed");
        }
        let event = TuiEvent::Job(JobEvent::Finished { job, outcome });
        if sender.send(event).await.is_err() {
            tracing::debug!("event loop closed before job finished");
        }
    })
}

/// Progress updates are best effort; a full channel drops them.
fn progress_reporter(sender: mpsc::Sender<TuiEvent>) -> ProgressFn {
    Arc::new(move |progress| {
        let _ = sender.try_send(TuiEvent::Job(JobEvent::Progress(progress)));
    })
}

pub async fn run(client: &DeviceClient, job: &Job, progress: ProgressFn) -> JobOutcome {
    match job {
        Job::Reload | Job::Poll { .. } => match client.fetch_document().await {
            Some(doc) => JobOutcome::Loaded {
                config: doc.config,
                raw: doc.raw,
            },
            None => failed("no readable configuration from the device"),
        },
        Job::Save { config, .. } => {
            if client.store_config(config).await {
                JobOutcome::Saved
            } else {
                failed("device rejected the configuration")
            }
        }
        Job::Export(path) => {
            let Some(bytes) = client.get_binary(CONFIG_PATH, Some(progress)).await else {
                return failed("device did not answer");
            };
            match tokio::fs::write(path, &bytes).await {
                Ok(()) => JobOutcome::Exported {
                    path: path.clone(),
                    bytes: bytes.len(),
                },
                Err(err) => failed(format!("cannot write {}: {}", path.display(), err)),
            }
        }
        Job::Import(path) => {
            let bytes = match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(err) => return failed(format!("cannot read {}: {}", path.display(), err)),
            };
            let len = bytes.len();
            if client.put(CONFIG_PATH, bytes, Some(progress)).await {
                JobOutcome::Imported {
                    path: path.clone(),
                    bytes: len,
                }
            } else {
                failed("device rejected the upload")
            }
        }
        Job::Delete(url) => {
            if client.delete(url).await {
                JobOutcome::Deleted { url: url.clone() }
            } else {
                failed("device refused the request")
            }
        }
    }
}

fn failed(reason: impl Into<String>) -> JobOutcome {
    JobOutcome::Failed {
        reason: reason.into(),
    }
}
