//! Update engine status and completion codes
//!
//! The engine reports opaque integers. These wrappers keep the integer
//! intact (unknown codes are relayed, not dropped) and map the known
//! ones to their names for logs and the persisted record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine status code delivered by status-changed callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineStatus(pub i32);

impl EngineStatus {
    pub const IDLE: Self = Self(0);
    pub const CHECKING_FOR_UPDATE: Self = Self(1);
    pub const UPDATE_AVAILABLE: Self = Self(2);
    pub const DOWNLOADING: Self = Self(3);
    pub const VERIFYING: Self = Self(4);
    pub const FINALIZING: Self = Self(5);
    pub const UPDATED_NEED_REBOOT: Self = Self(6);
    pub const REPORTING_ERROR_EVENT: Self = Self(7);
    pub const ATTEMPTING_ROLLBACK: Self = Self(8);
    pub const DISABLED: Self = Self(9);
    pub const CLEANUP_PREVIOUS_UPDATE: Self = Self(11);

    #[must_use]
    pub fn code(self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "IDLE",
            1 => "CHECKING_FOR_UPDATE",
            2 => "UPDATE_AVAILABLE",
            3 => "DOWNLOADING",
            4 => "VERIFYING",
            5 => "FINALIZING",
            6 => "UPDATED_NEED_REBOOT",
            7 => "REPORTING_ERROR_EVENT",
            8 => "ATTEMPTING_ROLLBACK",
            9 => "DISABLED",
            11 => "CLEANUP_PREVIOUS_UPDATE",
            _ => "UNKNOWN",
        }
    }

    /// `"<NAME>/<code>"` as stored in the record
    #[must_use]
    pub fn record_text(self) -> String {
        format!("{}/{}", self.name(), self.0)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Completion code delivered by payload-application-complete callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineErrorCode(pub i32);

impl EngineErrorCode {
    pub const SUCCESS: Self = Self(0);
    pub const ERROR: Self = Self(1);
    pub const FILESYSTEM_COPIER_ERROR: Self = Self(4);
    pub const POST_INSTALL_RUNNER_ERROR: Self = Self(5);
    pub const PAYLOAD_MISMATCHED_TYPE_ERROR: Self = Self(6);
    pub const INSTALL_DEVICE_OPEN_ERROR: Self = Self(7);
    pub const KERNEL_DEVICE_OPEN_ERROR: Self = Self(8);
    pub const DOWNLOAD_TRANSFER_ERROR: Self = Self(9);
    pub const PAYLOAD_HASH_MISMATCH_ERROR: Self = Self(10);
    pub const PAYLOAD_SIZE_MISMATCH_ERROR: Self = Self(11);
    pub const DOWNLOAD_PAYLOAD_VERIFICATION_ERROR: Self = Self(12);
    pub const USER_CANCELLED: Self = Self(48);
    pub const PAYLOAD_TIMESTAMP_ERROR: Self = Self(51);
    pub const UPDATED_BUT_NOT_ACTIVE: Self = Self(52);
    pub const NOT_ENOUGH_SPACE: Self = Self(60);
    pub const DEVICE_CORRUPTED: Self = Self(61);

    #[must_use]
    pub fn code(self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "SUCCESS",
            1 => "ERROR",
            4 => "FILESYSTEM_COPIER_ERROR",
            5 => "POST_INSTALL_RUNNER_ERROR",
            6 => "PAYLOAD_MISMATCHED_TYPE_ERROR",
            7 => "INSTALL_DEVICE_OPEN_ERROR",
            8 => "KERNEL_DEVICE_OPEN_ERROR",
            9 => "DOWNLOAD_TRANSFER_ERROR",
            10 => "PAYLOAD_HASH_MISMATCH_ERROR",
            11 => "PAYLOAD_SIZE_MISMATCH_ERROR",
            12 => "DOWNLOAD_PAYLOAD_VERIFICATION_ERROR",
            48 => "USER_CANCELLED",
            51 => "PAYLOAD_TIMESTAMP_ERROR",
            52 => "UPDATED_BUT_NOT_ACTIVE",
            60 => "NOT_ENOUGH_SPACE",
            61 => "DEVICE_CORRUPTED",
            _ => "UNKNOWN",
        }
    }

    /// `"<NAME>/<code>"` as stored in the record
    #[must_use]
    pub fn record_text(self) -> String {
        format!("{}/{}", self.name(), self.0)
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
