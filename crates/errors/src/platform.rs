//! Device platform errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors raised by device identity and power primitives
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlatformError {
    #[error("process execution failed: {command} - {message}")]
    ProcessExecutionFailed { command: String, message: String },

    #[error("command not found: {command}")]
    CommandNotFound { command: String },

    #[error("device property unavailable: {property}")]
    PropertyUnavailable { property: String },

    #[error("power operation failed: {operation} - {message}")]
    PowerOperationFailed { operation: String, message: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PropertyUnavailable { .. } | Self::CommandNotFound { .. } => {
                Some("Set the device product explicitly with --device or OTA_DEVICE.")
            }
            Self::PowerOperationFailed { .. } => {
                Some("Retry with privileges that allow wake locks and reboot.")
            }
            Self::ProcessExecutionFailed { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ProcessExecutionFailed { .. } => "platform.process_failed",
            Self::CommandNotFound { .. } => "platform.command_not_found",
            Self::PropertyUnavailable { .. } => "platform.property_unavailable",
            Self::PowerOperationFailed { .. } => "platform.power_failed",
        };
        Some(code)
    }
}
