//! Durable record store error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("database error: {message}")]
    Database { message: String },

    #[error("migration failed: {message}")]
    MigrationFailed { message: String },

    #[error("read failed for {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("write failed: {message}")]
    WriteFailed { message: String },
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            message: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for PersistenceError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::MigrationFailed {
            message: err.to_string(),
        }
    }
}

impl UserFacingError for PersistenceError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Database { .. } | Self::WriteFailed { .. } => {
                Some("Ensure the state database path is writable.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::WriteFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Database { .. } => "persistence.database",
            Self::MigrationFailed { .. } => "persistence.migration_failed",
            Self::ReadFailed { .. } => "persistence.read_failed",
            Self::WriteFailed { .. } => "persistence.write_failed",
        };
        Some(code)
    }
}
