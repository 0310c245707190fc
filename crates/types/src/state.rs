//! Updater state definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use ota_errors::StateError;

/// Lifecycle state of the update orchestrator
///
/// The numeric codes are part of the persisted record format
/// (`"<TEXT>/<code>"`) and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdaterState {
    #[default]
    Idle,
    Error,
    Running,
    Paused,
    SlotSwitchRequired,
    RebootRequired,
}

impl UpdaterState {
    /// Every state, in code order
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Error,
        Self::Running,
        Self::Paused,
        Self::SlotSwitchRequired,
        Self::RebootRequired,
    ];

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::Error => 1,
            Self::Running => 2,
            Self::Paused => 3,
            Self::SlotSwitchRequired => 4,
            Self::RebootRequired => 5,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Error => "ERROR",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::SlotSwitchRequired => "SLOT_SWITCH_REQUIRED",
            Self::RebootRequired => "REBOOT_REQUIRED",
        }
    }

    /// Text written to the `update_state` record field
    #[must_use]
    pub fn record_text(self) -> String {
        format!("{}/{}", self.as_str(), self.code())
    }

    /// Parse the authoritative prefix of a persisted `update_state` value.
    ///
    /// Only the substring before the first `/` is considered; `"unknown"`
    /// and any unrecognized text yield `None`.
    #[must_use]
    pub fn from_record_text(text: &str) -> Option<Self> {
        let prefix = text.split('/').next().unwrap_or_default();
        prefix.parse().ok()
    }
}

impl fmt::Display for UpdaterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdaterState {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| StateError::UnknownState { text: s.to_string() })
    }
}

/// Durable snapshot of the orchestrator's recoverable fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedUpdateRecord {
    /// `"<STATE_TEXT>/<code>"`
    pub update_state: String,
    /// `"<STATUS_TEXT>/<code>"` of the last engine status seen
    pub engine_state: String,
    /// `"<ERROR_TEXT>/<code>"` of the last completion code seen
    pub engine_error_state: String,
    /// Package the in-flight or last update was applied from
    pub file_path: String,
}

impl PersistedUpdateRecord {
    pub const UNKNOWN: &'static str = "unknown";

    pub const KEY_UPDATE_STATE: &'static str = "update_state";
    pub const KEY_ENGINE_STATE: &'static str = "engine_state";
    pub const KEY_ENGINE_ERROR_STATE: &'static str = "engine_error_state";
    pub const KEY_FILE_PATH: &'static str = "file_path";

    /// State prefix of `update_state`, if it names a known state
    #[must_use]
    pub fn updater_state(&self) -> Option<UpdaterState> {
        UpdaterState::from_record_text(&self.update_state)
    }

    /// Reset engine fields and the package path; keep `update_state` on `state`
    pub fn clear(&mut self, state: UpdaterState) {
        *self = Self {
            update_state: state.record_text(),
            ..Self::default()
        };
    }

    /// Key/value pairs in storage order
    #[must_use]
    pub fn to_pairs(&self) -> [(&'static str, &str); 4] {
        [
            (Self::KEY_UPDATE_STATE, self.update_state.as_str()),
            (Self::KEY_ENGINE_STATE, self.engine_state.as_str()),
            (Self::KEY_ENGINE_ERROR_STATE, self.engine_error_state.as_str()),
            (Self::KEY_FILE_PATH, self.file_path.as_str()),
        ]
    }
}

impl Default for PersistedUpdateRecord {
    fn default() -> Self {
        Self {
            update_state: Self::UNKNOWN.to_string(),
            engine_state: Self::UNKNOWN.to_string(),
            engine_error_state: Self::UNKNOWN.to_string(),
            file_path: String::new(),
        }
    }
}
