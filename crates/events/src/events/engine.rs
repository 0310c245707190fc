use ota_types::{EngineErrorCode, EngineStatus};
use serde::{Deserialize, Serialize};

/// Update engine relay events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Callback channel established
    Bound,

    /// Callback channel released
    Unbound,

    /// Payload handed to the engine
    PayloadSubmitted {
        locator: String,
        offset: u64,
        size: u64,
        header_count: usize,
    },

    /// Engine reported a status change
    StatusChanged { status: EngineStatus },

    /// Engine reported progress in [0, 1]
    Progress { fraction: f32 },

    /// Engine finished applying the payload
    PayloadApplicationComplete { error_code: EngineErrorCode },

    /// A synchronous engine call was refused
    CallFailed { operation: String, error: String },
}
