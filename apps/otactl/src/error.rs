//! CLI error handling

use std::fmt;

use ota_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(ota_errors::ConfigError),
    /// Orchestrator, package or platform error
    Update(ota_errors::Error),
    /// The update ended somewhere other than IDLE
    Unfinished(String),
    /// Stopped by a repeated interrupt
    Interrupted(String),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Update(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Unfinished(state) => write!(f, "Update did not complete: {state}"),
            CliError::Interrupted(detail) => write!(f, "Interrupted: {detail}"),
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Update(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ota_errors::ConfigError> for CliError {
    fn from(e: ota_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<ota_errors::Error> for CliError {
    fn from(e: ota_errors::Error) -> Self {
        CliError::Update(e)
    }
}

impl From<ota_errors::PersistenceError> for CliError {
    fn from(e: ota_errors::PersistenceError) -> Self {
        CliError::Update(e.into())
    }
}

impl From<ota_errors::PlatformError> for CliError {
    fn from(e: ota_errors::PlatformError) -> Self {
        CliError::Update(e.into())
    }
}

impl From<ota_errors::NetworkError> for CliError {
    fn from(e: ota_errors::NetworkError) -> Self {
        CliError::Update(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
