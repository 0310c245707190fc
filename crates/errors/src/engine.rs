//! Update engine error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum EngineError {
    /// A synchronous engine call was refused by the engine
    #[error("engine {operation} failed: {message}")]
    CallFailed { operation: String, message: String },

    /// The engine finished applying the payload with a non-success code
    #[error("payload application failed: {text}/{code}")]
    PayloadFailed { code: i32, text: String },

    #[error("engine not bound")]
    NotBound,

    #[error("engine busy: {message}")]
    Busy { message: String },
}

impl EngineError {
    pub fn call_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl UserFacingError for EngineError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotBound => Some("Bind to the update engine before issuing commands."),
            Self::PayloadFailed { .. } => Some("Reset the update and apply the package again."),
            Self::Busy { .. } => Some("Wait for the running update to finish or cancel it."),
            Self::CallFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CallFailed { .. } => "engine.call_failed",
            Self::PayloadFailed { .. } => "engine.payload_failed",
            Self::NotBound => "engine.not_bound",
            Self::Busy { .. } => "engine.busy",
        };
        Some(code)
    }
}
