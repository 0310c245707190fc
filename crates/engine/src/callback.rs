//! Engine callback channel

use ota_types::{EngineErrorCode, EngineStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Asynchronous notifications from the engine. They may interleave
/// arbitrarily and repeat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCallback {
    StatusChanged { status: EngineStatus },
    Progress { fraction: f32 },
    PayloadApplicationComplete { error_code: EngineErrorCode },
}

pub type EngineCallbackSender = mpsc::UnboundedSender<EngineCallback>;
pub type EngineCallbackReceiver = mpsc::UnboundedReceiver<EngineCallback>;

#[must_use]
pub fn callback_channel() -> (EngineCallbackSender, EngineCallbackReceiver) {
    mpsc::unbounded_channel()
}
