//! Listener interface for hosts

use ota_errors::ValidationFailure;
use ota_types::{EngineErrorCode, EngineStatus, UpdaterState};

/// Notifications delivered inside the orchestrator's critical section, in
/// the order the underlying events occurred. Implementations must not call
/// back into the orchestrator.
pub trait UpdateListener: Send + Sync {
    fn on_state_change(&self, _state: UpdaterState) {}

    fn on_engine_status(&self, _status: EngineStatus) {}

    fn on_engine_completion(&self, _error_code: EngineErrorCode) {}

    fn on_progress(&self, _fraction: f32) {}

    /// A package was declined before anything reached the engine
    fn on_validation_failure(&self, _failure: &ValidationFailure) {}
}
