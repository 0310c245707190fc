use ota_types::UpdaterState;
use serde::{Deserialize, Serialize};

/// Orchestrator state machine and recovery events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdaterEvent {
    /// A transition was applied
    StateChanged {
        from: UpdaterState,
        to: UpdaterState,
        action: String,
    },

    /// A transition was refused; the state did not change
    TransitionRejected { from: UpdaterState, action: String },

    /// The unvalidated direct-to-IDLE override was used
    ForcedIdle { from: UpdaterState, reason: String },

    /// Persisted state was reconciled on start
    Reconciled {
        persisted: String,
        state: UpdaterState,
    },

    /// Cancel was handed to the engine; waiting for acknowledgement
    CancelRequested,

    /// Post-success cleanup finished
    CleanupCompleted { file_path: String, deleted: bool },

    /// Persisting the record failed; the in-memory state is still authoritative
    RecordWriteFailed { error: String },

    /// Reading the record failed; defaults were used
    RecordReadFailed { error: String },

    /// The device is about to reboot into the updated slot
    RebootRequested,
}
