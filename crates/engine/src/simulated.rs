//! In-process engine for development hosts and tests
//!
//! Streams the payload range out of the local package file in chunks,
//! reporting status and progress the way the platform engine does, then
//! completes with a configured code. Nothing is written anywhere.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ota_config::EngineConfig;
use ota_errors::EngineError;
use ota_types::{EngineErrorCode, EngineStatus};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{EngineCallback, EngineCallbackSender, UpdateEngine};

const MAX_CHUNK_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SimulatedEngineConfig {
    /// Bytes read per progress step
    pub chunk_bytes: u64,
    /// Pause between steps
    pub step: Duration,
    /// Code reported when the payload streams through
    pub completion_code: EngineErrorCode,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: 1024 * 1024,
            step: Duration::from_millis(20),
            completion_code: EngineErrorCode::SUCCESS,
        }
    }
}

impl From<&EngineConfig> for SimulatedEngineConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            chunk_bytes: config.simulated_chunk_bytes,
            step: Duration::from_millis(config.simulated_step_ms),
            completion_code: EngineErrorCode(config.simulated_completion_code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Suspend,
    Cancel,
}

enum Outcome {
    Streamed,
    Cancelled,
}

struct Shared {
    callbacks: Option<EngineCallbackSender>,
    status: EngineStatus,
}

/// Delivers callbacks to whoever is bound at the time of sending
#[derive(Clone)]
struct Reporter {
    shared: Arc<Mutex<Shared>>,
}

impl Reporter {
    fn send(&self, callback: EngineCallback) {
        let Ok(mut shared) = self.shared.lock() else {
            return;
        };
        if let EngineCallback::StatusChanged { status } = callback {
            shared.status = status;
        }
        if let Some(callbacks) = &shared.callbacks {
            // A dropped receiver is the same as being unbound.
            let _ = callbacks.send(callback);
        }
    }

    fn status(&self, status: EngineStatus) {
        self.send(EngineCallback::StatusChanged { status });
    }
}

struct Job {
    control: watch::Sender<Control>,
    handle: JoinHandle<()>,
}

impl Job {
    fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

pub struct SimulatedEngine {
    config: SimulatedEngineConfig,
    reporter: Reporter,
    job: Mutex<Option<Job>>,
}

impl SimulatedEngine {
    #[must_use]
    pub fn new(config: SimulatedEngineConfig) -> Self {
        Self {
            config,
            reporter: Reporter {
                shared: Arc::new(Mutex::new(Shared {
                    callbacks: None,
                    status: EngineStatus::IDLE,
                })),
            },
            job: Mutex::new(None),
        }
    }

    /// Last status reported
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.reporter
            .shared
            .lock()
            .map_or(EngineStatus::IDLE, |shared| shared.status)
    }

    fn job(&self) -> Result<MutexGuard<'_, Option<Job>>, EngineError> {
        self.job
            .lock()
            .map_err(|_| EngineError::call_failed("lock", "engine state poisoned"))
    }

    fn shared(&self) -> Result<MutexGuard<'_, Shared>, EngineError> {
        self.reporter
            .shared
            .lock()
            .map_err(|_| EngineError::call_failed("lock", "engine state poisoned"))
    }

    fn signal(&self, operation: &str, control: Control) -> Result<(), EngineError> {
        let job = self.job()?;
        match job.as_ref().filter(|job| job.is_active()) {
            Some(job) => {
                job.control.send_replace(control);
                debug!(operation, "simulated engine signalled");
                Ok(())
            }
            None => Err(EngineError::call_failed(operation, "no update in progress")),
        }
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        if let Ok(mut job) = self.job.lock() {
            if let Some(running) = job.take() {
                running.handle.abort();
            }
        }
    }
}

impl UpdateEngine for SimulatedEngine {
    fn bind(&self, callbacks: EngineCallbackSender) -> Result<(), EngineError> {
        let mut shared = self.shared()?;
        // The platform engine re-delivers its current status on bind.
        let _ = callbacks.send(EngineCallback::StatusChanged {
            status: shared.status,
        });
        shared.callbacks = Some(callbacks);
        debug!("simulated engine bound");
        Ok(())
    }

    fn unbind(&self) -> Result<(), EngineError> {
        self.shared()?.callbacks = None;
        debug!("simulated engine unbound");
        Ok(())
    }

    fn apply_payload(
        &self,
        locator: &str,
        offset: u64,
        size: u64,
        headers: &[String],
    ) -> Result<(), EngineError> {
        let mut job = self.job()?;
        if job.as_ref().is_some_and(Job::is_active) {
            return Err(EngineError::Busy {
                message: "an update is already in progress".to_string(),
            });
        }

        let path = locator.strip_prefix("file://").map(PathBuf::from);
        info!(
            locator,
            offset,
            size,
            headers = headers.len(),
            "simulated engine applying payload"
        );

        let (control, receiver) = watch::channel(Control::Run);
        let handle = tokio::spawn(run(
            self.reporter.clone(),
            self.config.clone(),
            path,
            offset,
            size,
            receiver,
        ));
        *job = Some(Job { control, handle });
        Ok(())
    }

    fn cancel(&self) -> Result<(), EngineError> {
        let active = self.job()?.as_ref().is_some_and(Job::is_active);
        if active {
            self.signal("cancel", Control::Cancel)
        } else {
            // Nothing to stop; acknowledge straight away.
            self.reporter.status(EngineStatus::IDLE);
            Ok(())
        }
    }

    fn reset_status(&self) -> Result<(), EngineError> {
        if let Some(job) = self.job()?.take() {
            job.handle.abort();
        }
        self.shared()?.status = EngineStatus::IDLE;
        debug!("simulated engine status reset");
        Ok(())
    }

    fn suspend(&self) -> Result<(), EngineError> {
        self.signal("suspend", Control::Suspend)
    }

    fn resume(&self) -> Result<(), EngineError> {
        self.signal("resume", Control::Run)
    }

    fn set_switch_slot_on_reboot(&self) -> Result<(), EngineError> {
        info!("simulated engine will switch slot on reboot");
        Ok(())
    }
}

async fn run(
    reporter: Reporter,
    config: SimulatedEngineConfig,
    path: Option<PathBuf>,
    offset: u64,
    size: u64,
    mut control: watch::Receiver<Control>,
) {
    reporter.status(EngineStatus::DOWNLOADING);

    let outcome = match stream(&reporter, &config, path, offset, size, &mut control).await {
        Ok(Outcome::Streamed) => finish(&reporter, &config, &mut control).await,
        other => other,
    };

    let code = match outcome {
        Ok(Outcome::Streamed) => config.completion_code,
        Ok(Outcome::Cancelled) => EngineErrorCode::USER_CANCELLED,
        Err(code) => code,
    };

    if code.is_success() {
        reporter.status(EngineStatus::UPDATED_NEED_REBOOT);
    } else {
        reporter.status(EngineStatus::IDLE);
    }
    reporter.send(EngineCallback::PayloadApplicationComplete { error_code: code });
    debug!(code = %code, "simulated engine finished");
}

async fn stream(
    reporter: &Reporter,
    config: &SimulatedEngineConfig,
    path: Option<PathBuf>,
    offset: u64,
    size: u64,
    control: &mut watch::Receiver<Control>,
) -> Result<Outcome, EngineErrorCode> {
    let Some(path) = path else {
        warn!("simulated engine only reads file:// locators");
        return Err(EngineErrorCode::DOWNLOAD_TRANSFER_ERROR);
    };

    let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "cannot open payload");
        EngineErrorCode::DOWNLOAD_TRANSFER_ERROR
    })?;
    let len = file
        .metadata()
        .await
        .map_err(|_| EngineErrorCode::DOWNLOAD_TRANSFER_ERROR)?
        .len();
    match offset.checked_add(size) {
        Some(end) if end <= len => {}
        _ => {
            warn!(offset, size, len, "payload range outside package");
            return Err(EngineErrorCode::PAYLOAD_SIZE_MISMATCH_ERROR);
        }
    }
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|_| EngineErrorCode::DOWNLOAD_TRANSFER_ERROR)?;

    let chunk = usize::try_from(config.chunk_bytes.clamp(1, MAX_CHUNK_BYTES)).unwrap_or(1);
    let mut buf = vec![0u8; chunk];
    let mut done = 0u64;

    while done < size {
        if !checkpoint(control).await {
            return Ok(Outcome::Cancelled);
        }
        let want = usize::try_from(size - done).map_or(chunk, |left| left.min(chunk));
        file.read_exact(&mut buf[..want])
            .await
            .map_err(|_| EngineErrorCode::DOWNLOAD_TRANSFER_ERROR)?;
        done += want as u64;
        reporter.send(EngineCallback::Progress {
            fraction: fraction(done, size),
        });
        tokio::time::sleep(config.step).await;
    }

    if size == 0 {
        reporter.send(EngineCallback::Progress { fraction: 1.0 });
    }
    Ok(Outcome::Streamed)
}

async fn finish(
    reporter: &Reporter,
    config: &SimulatedEngineConfig,
    control: &mut watch::Receiver<Control>,
) -> Result<Outcome, EngineErrorCode> {
    for status in [EngineStatus::VERIFYING, EngineStatus::FINALIZING] {
        if !checkpoint(control).await {
            return Ok(Outcome::Cancelled);
        }
        reporter.status(status);
        tokio::time::sleep(config.step).await;
    }
    if checkpoint(control).await {
        Ok(Outcome::Streamed)
    } else {
        Ok(Outcome::Cancelled)
    }
}

/// Wait out a suspension. Returns false once cancelled.
async fn checkpoint(control: &mut watch::Receiver<Control>) -> bool {
    loop {
        let current = *control.borrow_and_update();
        match current {
            Control::Run => return true,
            Control::Cancel => return false,
            Control::Suspend => {
                if control.changed().await.is_err() {
                    return false;
                }
            }
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn fraction(done: u64, size: u64) -> f32 {
    if size == 0 {
        1.0
    } else {
        (done as f64 / size as f64) as f32
    }
}
