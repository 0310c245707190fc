//! Update package inspection error types

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// Reason a package was rejected before anything was handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationFailure {
    /// Metadata `pre-device` does not match the running device
    DeviceMismatch { expected: String, found: String },

    /// A required archive entry is absent
    MissingEntry { name: String },

    /// The payload entry is compressed; only stored entries can be streamed
    UnsupportedCompression { method: String },
}

impl ValidationFailure {
    /// Stable short reason used in logs and listener notifications
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DeviceMismatch { .. } => "device mismatch",
            Self::MissingEntry { .. } => "missing entry",
            Self::UnsupportedCompression { .. } => "unsupported payload compression",
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceMismatch { expected, found } => write!(
                f,
                "{}: package targets '{found}', device is '{expected}'",
                self.reason()
            ),
            Self::MissingEntry { name } => write!(f, "{}: {name}", self.reason()),
            Self::UnsupportedCompression { method } => {
                write!(f, "{}: {method}", self.reason())
            }
        }
    }
}

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackageError {
    #[error("package validation failed: {failure}")]
    Validation { failure: ValidationFailure },

    #[error("package not found: {path}")]
    NotFound { path: String },

    #[error("invalid package format: {message}")]
    InvalidFormat { message: String },

    #[error("failed to read package {path}: {message}")]
    Io { path: String, message: String },
}

impl PackageError {
    /// The validation failure carried by this error, if any
    #[must_use]
    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Validation { failure } => Some(failure),
            _ => None,
        }
    }
}

impl From<ValidationFailure> for PackageError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation { failure }
    }
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Validation {
                failure: ValidationFailure::DeviceMismatch { .. },
            } => Some("Download the package built for this device."),
            Self::Validation {
                failure: ValidationFailure::UnsupportedCompression { .. },
            } => Some("Rebuild the package with payload.bin stored uncompressed."),
            Self::InvalidFormat { .. } | Self::Validation { .. } => {
                Some("The package is not a valid OTA container; download it again.")
            }
            Self::NotFound { .. } => Some("Check the package path."),
            Self::Io { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Validation { failure } => match failure {
                ValidationFailure::DeviceMismatch { .. } => "package.device_mismatch",
                ValidationFailure::MissingEntry { .. } => "package.missing_entry",
                ValidationFailure::UnsupportedCompression { .. } => {
                    "package.unsupported_compression"
                }
            },
            Self::NotFound { .. } => "package.not_found",
            Self::InvalidFormat { .. } => "package.invalid_format",
            Self::Io { .. } => "package.io",
        };
        Some(code)
    }
}
