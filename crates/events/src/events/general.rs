use serde::{Deserialize, Serialize};

/// General events for warnings, errors and command lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Warning message with optional context
    Warning {
        message: String,
        context: Option<String>,
    },

    /// Error message with optional details
    Error {
        message: String,
        details: Option<String>,
    },

    /// A host command started
    OperationStarted { operation: String },

    /// A host command finished
    OperationCompleted { operation: String, success: bool },

    /// A host command failed
    OperationFailed { operation: String, error: String },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: None,
        }
    }

    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }
}
