use serde::{Deserialize, Serialize};

/// Package inspection events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PackageEvent {
    /// Inspection of a package started
    InspectionStarted { path: String },

    /// Payload located and package validated
    Inspected {
        path: String,
        offset: u64,
        size: u64,
        header_count: usize,
    },

    /// Package rejected before anything was handed to the engine
    ValidationFailed {
        path: String,
        reason: String,
        detail: String,
    },
}
