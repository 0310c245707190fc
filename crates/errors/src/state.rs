//! Updater state machine error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateError {
    /// The requested action is not allowed from the current updater state.
    /// The state is left unchanged when this is returned.
    #[error("invalid transition: cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    #[error("orchestrator not reconciled: {message}")]
    NotReconciled { message: String },

    #[error("unknown updater state: {text}")]
    UnknownState { text: String },
}

impl StateError {
    /// Build an `InvalidTransition` from anything displayable
    pub fn invalid_transition(from: impl ToString, action: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            action: action.to_string(),
        }
    }
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidTransition { .. } => {
                Some("Run `otactl status` to see the current updater state.")
            }
            Self::NotReconciled { .. } => {
                Some("Reconcile persisted state before binding to the update engine.")
            }
            Self::UnknownState { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidTransition { .. } => "state.invalid_transition",
            Self::NotReconciled { .. } => "state.not_reconciled",
            Self::UnknownState { .. } => "state.unknown_state",
        };
        Some(code)
    }
}
