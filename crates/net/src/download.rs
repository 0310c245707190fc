//! Resumable package download
//!
//! Bytes go to `<dest>.part` and the file is renamed to `dest` once the
//! body is complete. A later download of the same destination continues
//! from the partial file with a `Range: bytes=N-` request; a server that
//! answers `200` instead of `206` restarts the file from zero.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::StreamExt;
use ota_errors::{Error, NetworkError};
use ota_events::{AppEvent, EventEmitter, EventSender, NetworkEvent};
use reqwest::header::CONTENT_RANGE;
use reqwest::{Response, StatusCode};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{ensure_success, NetClient};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// What the download task is doing, observable through [`DownloadHandle::status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Preparing,
    Downloading {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },
    Paused {
        bytes_downloaded: u64,
    },
    Completed {
        path: PathBuf,
        size: u64,
    },
    Failed {
        reason: String,
    },
    Cancelled,
}

/// How a download task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { path: PathBuf, size: u64 },
    /// Stopped while paused; the partial file is kept for a later resume
    Paused { bytes_downloaded: u64 },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Pause,
    Cancel,
}

enum Transfer {
    Finished(u64),
    Interrupted,
}

/// A package to fetch into `dest`
#[derive(Debug, Clone)]
pub struct Download {
    url: String,
    dest: PathBuf,
    expected_size: Option<u64>,
}

impl Download {
    /// # Errors
    ///
    /// Returns `InvalidUrl` if `url` does not parse.
    pub fn new(url: &str, dest: impl Into<PathBuf>) -> Result<Self, Error> {
        Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            dest: dest.into(),
            expected_size: None,
        })
    }

    /// Fail the download if the finished file has a different length
    #[must_use]
    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Where bytes are written until the download completes
    #[must_use]
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self.dest.clone().into_os_string();
        name.push(".part");
        PathBuf::from(name)
    }

    /// Bytes already on disk from an earlier attempt
    pub async fn partial_len(&self) -> u64 {
        fs::metadata(self.partial_path())
            .await
            .map_or(0, |metadata| metadata.len())
    }

    /// Delete the partial file so the next start begins at zero. Returns
    /// whether there was one.
    ///
    /// # Errors
    ///
    /// Returns an error if the partial file exists but cannot be removed.
    pub async fn discard_partial(&self) -> Result<bool, Error> {
        remove_if_exists(&self.partial_path()).await
    }

    /// Spawn the download task
    #[must_use]
    pub fn start(self, client: NetClient, tx: EventSender) -> DownloadHandle {
        let (control_tx, control_rx) = watch::channel(Control::Run);
        let (status_tx, status_rx) = watch::channel(DownloadStatus::Preparing);
        let task = tokio::spawn(run(self, client, tx, control_rx, status_tx));
        DownloadHandle {
            control: control_tx,
            status: status_rx,
            task,
        }
    }
}

/// Controls a running download
pub struct DownloadHandle {
    control: watch::Sender<Control>,
    status: watch::Receiver<DownloadStatus>,
    task: JoinHandle<Result<DownloadOutcome, Error>>,
}

impl DownloadHandle {
    /// Stop transferring and keep the partial file
    pub fn pause(&self) {
        self.control.send_replace(Control::Pause);
    }

    /// Continue a paused download from the partial file
    pub fn resume(&self) {
        self.control.send_replace(Control::Run);
    }

    /// Abandon the download and delete the partial file
    pub fn cancel(&self) {
        self.control.send_replace(Control::Cancel);
    }

    #[must_use]
    pub fn status(&self) -> watch::Receiver<DownloadStatus> {
        self.status.clone()
    }

    /// Wait for the task to end. The handle keeps control, so this can be
    /// raced against other events and then followed by [`Self::finish`].
    ///
    /// # Errors
    ///
    /// Returns the transfer's error, or an internal error if the task panicked.
    pub async fn wait(&mut self) -> Result<DownloadOutcome, Error> {
        (&mut self.task)
            .await
            .map_err(|e| Error::internal(format!("download task failed: {e}")))?
    }

    /// Give up control and wait for the task to end. A paused download
    /// ends as [`DownloadOutcome::Paused`]; a running one runs to the end.
    ///
    /// # Errors
    ///
    /// Same as [`Self::wait`].
    pub async fn finish(self) -> Result<DownloadOutcome, Error> {
        let Self { control, task, .. } = self;
        drop(control);
        task.await
            .map_err(|e| Error::internal(format!("download task failed: {e}")))?
    }
}

async fn run(
    job: Download,
    client: NetClient,
    tx: EventSender,
    mut control: watch::Receiver<Control>,
    status: watch::Sender<DownloadStatus>,
) -> Result<DownloadOutcome, Error> {
    if let Some(parent) = job.dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }

    loop {
        if *control.borrow() == Control::Pause {
            let bytes_downloaded = job.partial_len().await;
            info!(url = %job.url, bytes_downloaded, "download paused");
            status.send_replace(DownloadStatus::Paused { bytes_downloaded });
            tx.emit(AppEvent::Network(NetworkEvent::DownloadPaused {
                url: job.url.clone(),
                bytes_downloaded,
            }));
        }

        match wait_while_paused(&mut control).await {
            Some(Control::Cancel) => return cancel(&job, &tx, &status).await,
            Some(_) => {}
            None => {
                let bytes_downloaded = job.partial_len().await;
                debug!(url = %job.url, bytes_downloaded, "download left paused");
                return Ok(DownloadOutcome::Paused { bytes_downloaded });
            }
        }

        status.send_replace(DownloadStatus::Preparing);
        match transfer(&job, &client, &tx, &mut control, &status).await {
            Ok(Transfer::Finished(size)) => return complete(&job, size, &tx, &status).await,
            Ok(Transfer::Interrupted) => {}
            Err(e) => {
                let bytes_downloaded = job.partial_len().await;
                warn!(url = %job.url, bytes_downloaded, error = %e, "download failed");
                status.send_replace(DownloadStatus::Failed {
                    reason: e.to_string(),
                });
                tx.emit(AppEvent::Network(NetworkEvent::DownloadFailed {
                    url: job.url.clone(),
                    error: e.to_string(),
                    bytes_downloaded,
                }));
                return Err(e);
            }
        }
    }
}

/// Resolves once the handle asks to pause or cancel. Never resolves after
/// the handle gave up control.
async fn stop_requested(control: &mut watch::Receiver<Control>) {
    loop {
        if control.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *control.borrow_and_update() != Control::Run {
            return;
        }
    }
}

/// Block while paused. `None` means the handle gave up control while paused.
async fn wait_while_paused(control: &mut watch::Receiver<Control>) -> Option<Control> {
    loop {
        let current = *control.borrow_and_update();
        if current != Control::Pause {
            return Some(current);
        }
        if control.changed().await.is_err() {
            return None;
        }
    }
}

async fn transfer(
    job: &Download,
    client: &NetClient,
    tx: &EventSender,
    control: &mut watch::Receiver<Control>,
    status: &watch::Sender<DownloadStatus>,
) -> Result<Transfer, Error> {
    let part = job.partial_path();
    let offset = job.partial_len().await;
    let response = tokio::select! {
        response = client.get_from(&job.url, offset) => response?,
        () = stop_requested(control) => return Ok(Transfer::Interrupted),
    };

    if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
        // The partial file is not a prefix of what the server has
        remove_if_exists(&part).await?;
        return Err(NetworkError::HttpError {
            status: StatusCode::RANGE_NOT_SATISFIABLE.as_u16(),
            message: "partial download discarded".to_string(),
        }
        .into());
    }
    let response = ensure_success(response)?;

    let resumed = offset > 0 && response.status() == StatusCode::PARTIAL_CONTENT;
    let start = if resumed { offset } else { 0 };
    let total_bytes = total_size(&response, start);
    let mut file = if resumed {
        OpenOptions::new().append(true).open(&part).await?
    } else {
        File::create(&part).await?
    };

    debug!(url = %job.url, start, total_bytes, "download started");
    tx.emit(AppEvent::Network(NetworkEvent::DownloadStarted {
        url: job.url.clone(),
        total_size: total_bytes,
        resume_offset: start,
    }));

    let mut downloaded = start;
    let mut last_report = Instant::now();
    let mut stream = response.bytes_stream();
    status.send_replace(DownloadStatus::Downloading {
        bytes_downloaded: downloaded,
        total_bytes,
    });

    loop {
        tokio::select! {
            () = stop_requested(control) => {
                file.flush().await?;
                return Ok(Transfer::Interrupted);
            }
            chunk = stream.next() => {
                let Some(chunk) = chunk else {
                    break;
                };
                let chunk = chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
                file.write_all(&chunk).await?;
                downloaded += chunk.len() as u64;

                status.send_replace(DownloadStatus::Downloading {
                    bytes_downloaded: downloaded,
                    total_bytes,
                });
                if last_report.elapsed() >= PROGRESS_INTERVAL {
                    tx.emit_download_progress(job.url.as_str(), downloaded, total_bytes);
                    last_report = Instant::now();
                }
            }
        }
    }

    file.flush().await?;
    tx.emit_download_progress(job.url.as_str(), downloaded, total_bytes);
    Ok(Transfer::Finished(downloaded))
}

async fn complete(
    job: &Download,
    size: u64,
    tx: &EventSender,
    status: &watch::Sender<DownloadStatus>,
) -> Result<DownloadOutcome, Error> {
    let part = job.partial_path();
    if let Some(expected) = job.expected_size {
        if expected != size {
            remove_if_exists(&part).await?;
            let error: Error = NetworkError::DownloadFailed(format!(
                "size mismatch: expected {expected} bytes, got {size}"
            ))
            .into();
            status.send_replace(DownloadStatus::Failed {
                reason: error.to_string(),
            });
            tx.emit(AppEvent::Network(NetworkEvent::DownloadFailed {
                url: job.url.clone(),
                error: error.to_string(),
                bytes_downloaded: size,
            }));
            return Err(error);
        }
    }

    fs::rename(&part, &job.dest)
        .await
        .map_err(|e| Error::io_with_path(&e, &job.dest))?;

    info!(url = %job.url, path = %job.dest.display(), size, "download completed");
    status.send_replace(DownloadStatus::Completed {
        path: job.dest.clone(),
        size,
    });
    tx.emit(AppEvent::Network(NetworkEvent::DownloadCompleted {
        url: job.url.clone(),
        path: job.dest.display().to_string(),
        final_size: size,
    }));
    Ok(DownloadOutcome::Completed {
        path: job.dest.clone(),
        size,
    })
}

async fn cancel(
    job: &Download,
    tx: &EventSender,
    status: &watch::Sender<DownloadStatus>,
) -> Result<DownloadOutcome, Error> {
    job.discard_partial().await?;
    info!(url = %job.url, "download cancelled");
    status.send_replace(DownloadStatus::Cancelled);
    tx.emit(AppEvent::Network(NetworkEvent::DownloadCancelled {
        url: job.url.clone(),
    }));
    Ok(DownloadOutcome::Cancelled)
}

/// Full length of the resource: the `Content-Range` total when present,
/// otherwise the body length plus where it starts
fn total_size(response: &Response, start: u64) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.rsplit_once('/'))
        .and_then(|(_, total)| total.parse().ok())
        .or_else(|| response.content_length().map(|len| len + start))
}

async fn remove_if_exists(path: &Path) -> Result<bool, Error> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}
