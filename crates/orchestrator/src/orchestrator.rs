//! The orchestrator proper

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use ota_engine::{callback_channel, EngineCallback, EngineCallbackReceiver, UpdateEngine};
use ota_errors::{EngineError, Error, StateError};
use ota_events::{AppEvent, EngineEvent, EventEmitter, EventSender, PackageEvent, UpdaterEvent};
use ota_platform::Platform;
use ota_state::{StateMachine, StatePersistence, Transition, UpdateAction};
use ota_types::{
    EngineErrorCode, EngineStatus, PackagePayloadDescriptor, PersistedUpdateRecord, UpdateConfig,
    UpdaterState,
};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::builder::OrchestratorBuilder;
use crate::listener::UpdateListener;

/// Everything guarded by the critical section
#[derive(Default)]
struct Core {
    machine: StateMachine,
    record: PersistedUpdateRecord,
    cancel_pending: bool,
    reconciled: bool,
    callbacks_task: Option<JoinHandle<()>>,
    listeners: Vec<Arc<dyn UpdateListener>>,
}

impl Core {
    fn state(&self) -> UpdaterState {
        self.machine.state()
    }

    fn bound(&self) -> bool {
        self.callbacks_task.is_some()
    }

    fn notify(&self, f: impl Fn(&dyn UpdateListener)) {
        for listener in &self.listeners {
            f(listener.as_ref());
        }
    }
}

struct Inner {
    core: Mutex<Core>,
    engine: Arc<dyn UpdateEngine>,
    platform: Platform,
    persistence: StatePersistence,
    tx: Option<EventSender>,
    payload_root: Option<PathBuf>,
}

impl EventEmitter for Inner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

/// States in which an update holds the wake lock
fn holds_wake_lock(state: UpdaterState) -> bool {
    matches!(state, UpdaterState::Running | UpdaterState::Paused)
}

/// Drives one update at a time through the engine. Cheap to clone; clones
/// share the same state.
#[derive(Clone)]
pub struct UpdateOrchestrator {
    inner: Arc<Inner>,
}

impl UpdateOrchestrator {
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub(crate) fn new(
        engine: Arc<dyn UpdateEngine>,
        platform: Platform,
        persistence: StatePersistence,
        tx: Option<EventSender>,
        payload_root: Option<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core::default()),
                engine,
                platform,
                persistence,
                tx,
                payload_root,
            }),
        }
    }

    async fn lock(&self) -> MutexGuard<'_, Core> {
        self.inner.core.lock().await
    }

    /// Register a listener
    pub async fn add_listener(&self, listener: Arc<dyn UpdateListener>) {
        self.lock().await.listeners.push(listener);
    }

    pub async fn state(&self) -> UpdaterState {
        self.lock().await.state()
    }

    /// Copy of the in-memory record
    pub async fn record(&self) -> PersistedUpdateRecord {
        self.lock().await.record.clone()
    }

    pub async fn is_bound(&self) -> bool {
        self.lock().await.bound()
    }

    /// Restore the state from the persisted record. Must run before
    /// [`bind`](Self::bind).
    ///
    /// A persisted RUNNING is re-asserted through the transition table. Any
    /// other persisted value, including an unreadable or unknown one, is
    /// replaced by IDLE through the machine's escape hatch.
    ///
    /// # Errors
    ///
    /// Returns an error only if re-asserting RUNNING is refused by the table.
    pub async fn reconcile_on_start(&self) -> Result<UpdaterState, Error> {
        let mut core = self.lock().await;

        core.record = match self.inner.persistence.load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "failed to read update record, using defaults");
                self.inner.emit(AppEvent::Updater(UpdaterEvent::RecordReadFailed {
                    error: e.to_string(),
                }));
                PersistedUpdateRecord::default()
            }
        };
        let persisted = core.record.update_state.clone();

        if core.record.updater_state() == Some(UpdaterState::Running) {
            if core.state() != UpdaterState::Running {
                self.transition(&mut core, UpdateAction::Apply).await?;
                self.acquire_wake_lock().await;
            }
        } else {
            self.force_idle_locked(&mut core, &format!("persisted state {persisted}"))
                .await;
        }

        core.reconciled = true;
        let state = core.state();
        info!(persisted = %persisted, state = %state, "reconciled updater state");
        self.inner
            .emit(AppEvent::Updater(UpdaterEvent::Reconciled { persisted, state }));
        Ok(state)
    }

    /// Start receiving engine callbacks. Binding twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotReconciled` before [`reconcile_on_start`](Self::reconcile_on_start),
    /// or the engine's error if it refuses the binding.
    pub async fn bind(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        if !core.reconciled {
            return Err(StateError::NotReconciled {
                message: "reconcile_on_start must run before bind".to_string(),
            }
            .into());
        }
        if core.bound() {
            return Ok(());
        }

        let (tx, rx) = callback_channel();
        let task = tokio::spawn(process_callbacks(Arc::downgrade(&self.inner), rx));
        if let Err(e) = self.inner.engine.bind(tx) {
            task.abort();
            self.engine_call_failed("bind", &e);
            return Err(e.into());
        }

        core.callbacks_task = Some(task);
        debug!("bound to update engine");
        self.inner.emit(AppEvent::Engine(EngineEvent::Bound));
        Ok(())
    }

    /// Stop receiving engine callbacks. Unbinding twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if it refuses; callbacks stop regardless.
    pub async fn unbind(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        let Some(task) = core.callbacks_task.take() else {
            return Ok(());
        };
        let result = self.inner.engine.unbind();
        task.abort();
        debug!("unbound from update engine");
        self.inner.emit(AppEvent::Engine(EngineEvent::Unbound));
        result.map_err(|e| {
            self.engine_call_failed("unbind", &e);
            e.into()
        })
    }

    /// Validate `config`'s package and hand its payload to the engine
    ///
    /// Requires IDLE. The package is inspected before the state changes, so
    /// a rejected package leaves the updater IDLE and nothing reaches the
    /// engine. Returns as soon as the engine has accepted the payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside IDLE, `NotBound` before
    /// [`bind`](Self::bind), a package error if validation fails, or the
    /// engine's error if it refuses the payload (the updater is then in
    /// ERROR).
    pub async fn apply_update(
        &self,
        config: &UpdateConfig,
    ) -> Result<PackagePayloadDescriptor, Error> {
        let mut core = self.lock().await;
        self.check(&core, UpdateAction::Apply)?;
        if !core.bound() {
            return Err(EngineError::NotBound.into());
        }

        let path = config.package_path.display().to_string();
        let device = self.inner.platform.device().product().await?;
        self.inner
            .emit(AppEvent::Package(PackageEvent::InspectionStarted { path: path.clone() }));

        let descriptor = match ota_package::inspect_file(&config.package_path, &device).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                if let Some(failure) = e.validation_failure() {
                    warn!(path = %path, reason = failure.reason(), "package rejected");
                    self.inner
                        .emit(AppEvent::Package(PackageEvent::ValidationFailed {
                            path: path.clone(),
                            reason: failure.reason().to_string(),
                            detail: failure.to_string(),
                        }));
                    core.notify(|l| l.on_validation_failure(failure));
                }
                return Err(e);
            }
        };
        self.inner.emit(AppEvent::Package(PackageEvent::Inspected {
            path: path.clone(),
            offset: descriptor.offset,
            size: descriptor.size,
            header_count: descriptor.headers.len(),
        }));

        core.record.file_path = path;
        core.record.engine_error_state = PersistedUpdateRecord::UNKNOWN.to_string();
        self.transition(&mut core, UpdateAction::Apply).await?;
        self.acquire_wake_lock().await;

        let locator = config.payload_locator(self.inner.payload_root.as_deref());
        self.engine_call(&mut core, "apply_payload", |engine| {
            engine.apply_payload(
                &locator,
                descriptor.offset,
                descriptor.size,
                &descriptor.headers,
            )
        })
        .await?;

        info!(
            name = %config.name,
            locator = %locator,
            offset = descriptor.offset,
            size = descriptor.size,
            "payload submitted"
        );
        self.inner
            .emit(AppEvent::Engine(EngineEvent::PayloadSubmitted {
                locator,
                offset: descriptor.offset,
                size: descriptor.size,
                header_count: descriptor.headers.len(),
            }));
        Ok(descriptor)
    }

    /// Ask the engine to stop the running update
    ///
    /// The updater stays RUNNING until the engine acknowledges with an IDLE
    /// status or a `USER_CANCELLED` completion.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside RUNNING or the engine's error.
    pub async fn cancel_running_update(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        self.check(&core, UpdateAction::Cancel)?;
        self.engine_call(&mut core, "cancel", |engine| engine.cancel())
            .await?;
        core.cancel_pending = true;
        info!("cancel requested");
        self.inner.emit(AppEvent::Updater(UpdaterEvent::CancelRequested));
        Ok(())
    }

    /// Discard a paused, failed or slot-pending update and clear the record
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside PAUSED, ERROR and
    /// SLOT_SWITCH_REQUIRED, or the engine's error.
    pub async fn reset_update(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        self.check(&core, UpdateAction::Reset)?;
        self.engine_call(&mut core, "reset_status", |engine| engine.reset_status())
            .await?;
        core.record.clear(UpdaterState::Idle);
        self.transition(&mut core, UpdateAction::Reset).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidTransition` outside RUNNING or the engine's error.
    pub async fn suspend(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        self.check(&core, UpdateAction::Suspend)?;
        self.engine_call(&mut core, "suspend", |engine| engine.suspend())
            .await?;
        self.transition(&mut core, UpdateAction::Suspend).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidTransition` outside PAUSED or the engine's error.
    pub async fn resume(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        self.check(&core, UpdateAction::Resume)?;
        self.engine_call(&mut core, "resume", |engine| engine.resume())
            .await?;
        self.transition(&mut core, UpdateAction::Resume).await?;
        Ok(())
    }

    /// Activate the freshly written slot on next boot
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside SLOT_SWITCH_REQUIRED or the
    /// engine's error.
    pub async fn set_switch_slot_on_reboot(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        self.check(&core, UpdateAction::SwitchSlot)?;
        self.engine_call(&mut core, "set_switch_slot_on_reboot", |engine| {
            engine.set_switch_slot_on_reboot()
        })
        .await?;
        self.transition(&mut core, UpdateAction::SwitchSlot).await?;
        Ok(())
    }

    /// Engine status callback
    pub async fn on_engine_status_changed(&self, status: EngineStatus) {
        let mut core = self.lock().await;
        core.record.engine_state = status.record_text();
        debug!(status = %status, code = status.code(), "engine status");
        self.inner.emit_engine_status(status);
        core.notify(|l| l.on_engine_status(status));

        let state = core.state();
        if state == UpdaterState::Running && status == EngineStatus::IDLE && core.cancel_pending {
            self.engine_driven(&mut core, UpdateAction::Cancel).await;
        } else if state == UpdaterState::Running && status == EngineStatus::UPDATED_NEED_REBOOT {
            // Re-delivered on bind after a restart that missed the completion.
            self.complete_success(&mut core).await;
        } else {
            self.save(&core).await;
        }
    }

    /// Engine progress callback; relayed only
    pub async fn on_engine_progress(&self, fraction: f32) {
        let core = self.lock().await;
        self.inner.emit_engine_progress(fraction);
        core.notify(|l| l.on_progress(fraction));
    }

    /// Engine payload-application-complete callback
    pub async fn on_engine_payload_complete(&self, error_code: EngineErrorCode) {
        let mut core = self.lock().await;
        core.record.engine_error_state = error_code.record_text();
        info!(code = %error_code, value = error_code.code(), "payload application complete");
        self.inner.emit_engine_completion(error_code);
        core.notify(|l| l.on_engine_completion(error_code));

        let state = core.state();
        match error_code {
            EngineErrorCode::SUCCESS if state == UpdaterState::Running => {
                self.complete_success(&mut core).await;
            }
            EngineErrorCode::USER_CANCELLED if core.cancel_pending => {
                self.engine_driven(&mut core, UpdateAction::Cancel).await;
            }
            // Already handled through the status callback.
            EngineErrorCode::SUCCESS | EngineErrorCode::USER_CANCELLED
                if state == UpdaterState::Idle =>
            {
                self.save(&core).await;
            }
            EngineErrorCode::UPDATED_BUT_NOT_ACTIVE => {
                self.engine_driven(&mut core, UpdateAction::EngineSlotReady)
                    .await;
            }
            _ => {
                if state == UpdaterState::Running {
                    let err = EngineError::PayloadFailed {
                        code: error_code.code(),
                        text: error_code.name().to_string(),
                    };
                    warn!(error = %err, "update failed");
                }
                self.engine_driven(&mut core, UpdateAction::EngineFailed)
                    .await;
            }
        }
    }

    /// Write the in-memory record; hosts call this when going to background
    /// or shutting down
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn persist_snapshot(&self) -> Result<(), Error> {
        let core = self.lock().await;
        self.inner.persistence.save(&core.record).await?;
        debug!(update_state = %core.record.update_state, "persisted snapshot");
        Ok(())
    }

    /// Clear the record and reboot the device
    ///
    /// # Errors
    ///
    /// Returns the platform's error if the reboot cannot be issued.
    pub async fn request_reboot(&self) -> Result<(), Error> {
        let mut core = self.lock().await;
        let state = core.state();
        core.record.clear(state);
        self.save(&core).await;
        info!("reboot requested");
        self.inner
            .emit(AppEvent::Updater(UpdaterEvent::RebootRequested));
        self.inner.platform.power().reboot().await?;
        Ok(())
    }

    /// Administrative override: drop whatever is recorded and go IDLE
    /// without consulting the transition table or the engine
    pub async fn force_idle(&self, reason: &str) {
        let mut core = self.lock().await;
        core.record.clear(UpdaterState::Idle);
        self.force_idle_locked(&mut core, reason).await;
    }

    async fn force_idle_locked(&self, core: &mut Core, reason: &str) {
        let from = core.machine.force_idle();
        core.cancel_pending = false;
        core.record.update_state = UpdaterState::Idle.record_text();
        self.save(core).await;

        warn!(from = %from, reason, "forced updater state to IDLE");
        self.inner.emit(AppEvent::Updater(UpdaterEvent::ForcedIdle {
            from,
            reason: reason.to_string(),
        }));
        core.notify(|l| l.on_state_change(UpdaterState::Idle));
        if holds_wake_lock(from) {
            self.release_wake_lock().await;
        }
    }

    fn check(&self, core: &Core, action: UpdateAction) -> Result<UpdaterState, Error> {
        core.machine
            .check(action)
            .map_err(|e| self.rejected(core.state(), action, e))
    }

    fn rejected(&self, from: UpdaterState, action: UpdateAction, error: StateError) -> Error {
        warn!(from = %from, action = %action, "transition rejected");
        self.inner.emit_transition_rejected(from, action.as_str());
        error.into()
    }

    /// Apply `action`, persist, and republish the new state
    async fn transition(&self, core: &mut Core, action: UpdateAction) -> Result<Transition, Error> {
        let transition = match core.machine.apply(action) {
            Ok(transition) => transition,
            Err(e) => return Err(self.rejected(core.state(), action, e)),
        };
        let Transition { from, to, .. } = transition;

        core.record.update_state = to.record_text();
        if to != UpdaterState::Running {
            core.cancel_pending = false;
        }
        self.save(core).await;

        info!(from = %from, to = %to, action = %action, "updater state changed");
        self.inner.emit_state_changed(from, to, action.as_str());
        core.notify(|l| l.on_state_change(to));

        if holds_wake_lock(from) && !holds_wake_lock(to) {
            self.release_wake_lock().await;
        }
        Ok(transition)
    }

    /// Transition driven by an engine callback. A callback that arrives in
    /// a state where its transition is not allowed is still recorded but
    /// changes nothing.
    async fn engine_driven(&self, core: &mut Core, action: UpdateAction) {
        if core.machine.check(action).is_ok() {
            // Cannot fail: checked under the same lock.
            let _ = self.transition(core, action).await;
        } else {
            let state = core.state();
            warn!(state = %state, action = %action, "engine callback ignored in current state");
            self.inner.emit_warning_with_context(
                format!("engine callback ignored while {state}"),
                action.as_str(),
            );
            self.save(core).await;
        }
    }

    /// RUNNING -> REBOOT_REQUIRED, then release the package and go IDLE
    async fn complete_success(&self, core: &mut Core) {
        if self.transition(core, UpdateAction::EngineSucceeded).await.is_err() {
            return;
        }

        let file_path = std::mem::take(&mut core.record.file_path);
        let deleted = if file_path.is_empty() {
            false
        } else {
            match tokio::fs::remove_file(&file_path).await {
                Ok(()) => true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => {
                    warn!(path = %file_path, error = %e, "failed to delete applied package");
                    false
                }
            }
        };

        core.record.clear(UpdaterState::RebootRequired);
        let _ = self.transition(core, UpdateAction::Cleanup).await;
        info!(path = %file_path, deleted, "update applied; reboot to finish");
        self.inner
            .emit(AppEvent::Updater(UpdaterEvent::CleanupCompleted { file_path, deleted }));
    }

    /// Run a synchronous engine call. A failure while RUNNING moves the
    /// updater to ERROR.
    async fn engine_call(
        &self,
        core: &mut Core,
        operation: &str,
        call: impl FnOnce(&dyn UpdateEngine) -> Result<(), EngineError>,
    ) -> Result<(), Error> {
        match call(self.inner.engine.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.engine_call_failed(operation, &e);
                if core.state() == UpdaterState::Running {
                    let _ = self.transition(core, UpdateAction::EngineFailed).await;
                }
                Err(e.into())
            }
        }
    }

    fn engine_call_failed(&self, operation: &str, error: &EngineError) {
        warn!(operation, error = %error, "engine call failed");
        self.inner.emit(AppEvent::Engine(EngineEvent::CallFailed {
            operation: operation.to_string(),
            error: error.to_string(),
        }));
    }

    /// Persist the record; failures are logged and do not abort the caller
    async fn save(&self, core: &Core) {
        if let Err(e) = self.inner.persistence.save(&core.record).await {
            warn!(error = %e, "failed to persist update record");
            self.inner
                .emit(AppEvent::Updater(UpdaterEvent::RecordWriteFailed {
                    error: e.to_string(),
                }));
        }
    }

    async fn acquire_wake_lock(&self) {
        if let Err(e) = self.inner.platform.power().acquire_wake_lock().await {
            warn!(error = %e, "failed to acquire wake lock");
        }
    }

    async fn release_wake_lock(&self) {
        if let Err(e) = self.inner.platform.power().release_wake_lock().await {
            warn!(error = %e, "failed to release wake lock");
        }
    }
}

/// Consume engine callbacks one at a time until unbound or dropped
async fn process_callbacks(inner: Weak<Inner>, mut rx: EngineCallbackReceiver) {
    while let Some(callback) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let orchestrator = UpdateOrchestrator { inner };
        match callback {
            EngineCallback::StatusChanged { status } => {
                orchestrator.on_engine_status_changed(status).await;
            }
            EngineCallback::Progress { fraction } => {
                orchestrator.on_engine_progress(fraction).await;
            }
            EngineCallback::PayloadApplicationComplete { error_code } => {
                orchestrator.on_engine_payload_complete(error_code).await;
            }
        }
    }
    debug!("engine callback loop finished");
}
