//! Shared fixtures for orchestrator tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ota_engine::{EngineCallback, EngineCallbackSender, UpdateEngine};
use ota_errors::{EngineError, PlatformError, ValidationFailure};
use ota_orchestrator::{UpdateListener, UpdateOrchestrator};
use ota_platform::{Platform, PowerControl, StaticDevice};
use ota_state::{MemoryStore, StatePersistence};
use ota_types::{EngineErrorCode, EngineStatus, UpdateConfig, UpdaterState};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PAYLOAD_LEN: usize = 1000;

/// Package with two header lines, `pre-device=<device>` and a stored payload
pub fn package_bytes(device: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer
        .start_file("META-INF/com/android/metadata", stored)
        .unwrap();
    write!(writer, "ota-type=AB\npre-device={device}\n").unwrap();
    writer.start_file("payload_properties.txt", stored).unwrap();
    writer
        .write_all(b"FILE_HASH=abc\nFILE_SIZE=1000\n")
        .unwrap();
    writer.start_file("payload.bin", stored).unwrap();
    writer.write_all(&[7u8; PAYLOAD_LEN]).unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn write_package(dir: &Path, name: &str, device: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, package_bytes(device)).unwrap();
    path
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Bind,
    Unbind,
    Apply {
        locator: String,
        offset: u64,
        size: u64,
        headers: Vec<String>,
    },
    Cancel,
    ResetStatus,
    Suspend,
    Resume,
    SwitchSlot,
}

/// Engine double: records calls, optionally fails one operation, and lets
/// the test push callbacks through whatever was bound
#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<Call>>,
    pub fail: Mutex<Option<&'static str>>,
    callbacks: Mutex<Option<EngineCallbackSender>>,
}

impl FakeEngine {
    pub fn fail_on(&self, operation: &'static str) {
        *self.fail.lock().unwrap() = Some(operation);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, callback: EngineCallback) {
        if let Some(tx) = self.callbacks.lock().unwrap().as_ref() {
            tx.send(callback).unwrap();
        }
    }

    pub fn status(&self, status: EngineStatus) {
        self.emit(EngineCallback::StatusChanged { status });
    }

    pub fn complete(&self, error_code: EngineErrorCode) {
        self.emit(EngineCallback::PayloadApplicationComplete { error_code });
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(call);
        if *self.fail.lock().unwrap() == Some(operation) {
            return Err(EngineError::call_failed(operation, "injected failure"));
        }
        Ok(())
    }
}

impl UpdateEngine for FakeEngine {
    fn bind(&self, callbacks: EngineCallbackSender) -> Result<(), EngineError> {
        self.record("bind", Call::Bind)?;
        *self.callbacks.lock().unwrap() = Some(callbacks);
        Ok(())
    }

    fn unbind(&self) -> Result<(), EngineError> {
        *self.callbacks.lock().unwrap() = None;
        self.record("unbind", Call::Unbind)
    }

    fn apply_payload(
        &self,
        locator: &str,
        offset: u64,
        size: u64,
        headers: &[String],
    ) -> Result<(), EngineError> {
        self.record(
            "apply_payload",
            Call::Apply {
                locator: locator.to_string(),
                offset,
                size,
                headers: headers.to_vec(),
            },
        )
    }

    fn cancel(&self) -> Result<(), EngineError> {
        self.record("cancel", Call::Cancel)
    }

    fn reset_status(&self) -> Result<(), EngineError> {
        self.record("reset_status", Call::ResetStatus)
    }

    fn suspend(&self) -> Result<(), EngineError> {
        self.record("suspend", Call::Suspend)
    }

    fn resume(&self) -> Result<(), EngineError> {
        self.record("resume", Call::Resume)
    }

    fn set_switch_slot_on_reboot(&self) -> Result<(), EngineError> {
        self.record("set_switch_slot_on_reboot", Call::SwitchSlot)
    }
}

#[derive(Default)]
pub struct RecordingPower {
    pub events: Mutex<Vec<&'static str>>,
}

impl RecordingPower {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl PowerControl for RecordingPower {
    async fn acquire_wake_lock(&self) -> Result<(), PlatformError> {
        self.events.lock().unwrap().push("acquire");
        Ok(())
    }

    async fn release_wake_lock(&self) -> Result<(), PlatformError> {
        self.events.lock().unwrap().push("release");
        Ok(())
    }

    async fn reboot(&self) -> Result<(), PlatformError> {
        self.events.lock().unwrap().push("reboot");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    State(UpdaterState),
    Status(EngineStatus),
    Completion(EngineErrorCode),
    Progress(f32),
    Rejected(String),
}

#[derive(Default)]
pub struct RecordingListener {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingListener {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<UpdaterState> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl UpdateListener for RecordingListener {
    fn on_state_change(&self, state: UpdaterState) {
        self.notices.lock().unwrap().push(Notice::State(state));
    }

    fn on_engine_status(&self, status: EngineStatus) {
        self.notices.lock().unwrap().push(Notice::Status(status));
    }

    fn on_engine_completion(&self, error_code: EngineErrorCode) {
        self.notices
            .lock()
            .unwrap()
            .push(Notice::Completion(error_code));
    }

    fn on_progress(&self, fraction: f32) {
        self.notices.lock().unwrap().push(Notice::Progress(fraction));
    }

    fn on_validation_failure(&self, failure: &ValidationFailure) {
        self.notices
            .lock()
            .unwrap()
            .push(Notice::Rejected(failure.reason().to_string()));
    }
}

pub struct Harness {
    pub orchestrator: UpdateOrchestrator,
    pub engine: Arc<FakeEngine>,
    pub power: Arc<RecordingPower>,
    pub store: Arc<MemoryStore>,
    pub listener: Arc<RecordingListener>,
    pub dir: TempDir,
}

impl Harness {
    /// Orchestrator on `device` over a store that may already hold a record
    pub async fn with_store(device: &str, store: Arc<MemoryStore>) -> Self {
        let engine = Arc::new(FakeEngine::default());
        let power = Arc::new(RecordingPower::default());
        let listener = Arc::new(RecordingListener::default());
        let platform = Platform::new(Arc::new(StaticDevice::new(device)), power.clone());

        let orchestrator = UpdateOrchestrator::builder()
            .with_engine(engine.clone())
            .with_platform(platform)
            .with_persistence(StatePersistence::new(store.clone()))
            .build()
            .unwrap();
        orchestrator.add_listener(listener.clone()).await;

        Self {
            orchestrator,
            engine,
            power,
            store,
            listener,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Reconciled and bound orchestrator with an empty store
    pub async fn ready(device: &str) -> Self {
        let harness = Self::with_store(device, Arc::new(MemoryStore::new())).await;
        harness.orchestrator.reconcile_on_start().await.unwrap();
        harness.orchestrator.bind().await.unwrap();
        harness
    }

    pub fn package(&self, device: &str) -> UpdateConfig {
        UpdateConfig::from_package_path(write_package(self.dir.path(), "ota-update.zip", device))
    }

    /// Persisted `update_state`
    pub fn persisted_state(&self) -> Option<String> {
        self.store.snapshot("update_state")
    }

    /// Apply the package for this device and check it reached RUNNING
    pub async fn running(&self, device: &str) -> UpdateConfig {
        let config = self.package(device);
        self.orchestrator.apply_update(&config).await.unwrap();
        assert_eq!(self.orchestrator.state().await, UpdaterState::Running);
        config
    }
}

/// Poll until the orchestrator reaches `state`
pub async fn wait_for_state(orchestrator: &UpdateOrchestrator, state: UpdaterState) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while orchestrator.state().await != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("orchestrator never reached {state}"));
}

/// Let the callback loop drain what has been queued
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
