#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in ota
//!
//! Libraries never print. Everything a host might want to show or log
//! (state transitions, engine relays, package inspection results) is
//! emitted as an [`AppEvent`] on an unbounded channel, and the host decides
//! how to render or trace it.

pub mod meta;
pub use meta::EventSource;

pub mod events;
pub use events::{
    AppEvent, EngineEvent, GeneralEvent, NetworkEvent, PackageEvent, UpdaterEvent,
};

use ota_types::{EngineErrorCode, EngineStatus, UpdaterState};
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout the ota system
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit an operation started event
    fn emit_operation_started(&self, operation: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationStarted {
            operation: operation.into(),
        }));
    }

    /// Emit an operation completed event
    fn emit_operation_completed(&self, operation: impl Into<String>, success: bool) {
        self.emit(AppEvent::General(GeneralEvent::OperationCompleted {
            operation: operation.into(),
            success,
        }));
    }

    /// Emit an operation failed event
    fn emit_operation_failed(&self, operation: impl Into<String>, error: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationFailed {
            operation: operation.into(),
            error: error.into(),
        }));
    }

    /// Emit a state transition event
    fn emit_state_changed(&self, from: UpdaterState, to: UpdaterState, action: impl Into<String>) {
        self.emit(AppEvent::Updater(UpdaterEvent::StateChanged {
            from,
            to,
            action: action.into(),
        }));
    }

    /// Emit a rejected transition event
    fn emit_transition_rejected(&self, from: UpdaterState, action: impl Into<String>) {
        self.emit(AppEvent::Updater(UpdaterEvent::TransitionRejected {
            from,
            action: action.into(),
        }));
    }

    /// Emit an engine status relay
    fn emit_engine_status(&self, status: EngineStatus) {
        self.emit(AppEvent::Engine(EngineEvent::StatusChanged { status }));
    }

    /// Emit an engine progress relay
    fn emit_engine_progress(&self, fraction: f32) {
        self.emit(AppEvent::Engine(EngineEvent::Progress { fraction }));
    }

    /// Emit a download progress update
    fn emit_download_progress(
        &self,
        url: impl Into<String>,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    ) {
        self.emit(AppEvent::Network(NetworkEvent::DownloadProgress {
            url: url.into(),
            bytes_downloaded,
            total_bytes,
        }));
    }

    /// Emit an engine completion relay
    fn emit_engine_completion(&self, error_code: EngineErrorCode) {
        self.emit(AppEvent::Engine(EngineEvent::PayloadApplicationComplete {
            error_code,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
