//! Updater state machine
//!
//! Pure transition logic. The machine holds the current [`UpdaterState`] and
//! applies [`UpdateAction`]s through a fixed table; anything outside the
//! table is refused with [`StateError::InvalidTransition`] and leaves the
//! state untouched. Locking and persistence belong to the caller.

use std::fmt;

use ota_errors::StateError;
use ota_types::UpdaterState;
use serde::{Deserialize, Serialize};

/// Triggers that move the updater between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    /// Caller starts applying a package
    Apply,
    /// Caller pauses the running update
    Suspend,
    /// Caller resumes a paused update
    Resume,
    /// Engine acknowledged a cancel request
    Cancel,
    /// Caller discards a paused, failed or slot-pending update
    Reset,
    /// Engine reported a failure
    EngineFailed,
    /// Engine reported the new slot is written but not active
    EngineSlotReady,
    /// Engine reported the payload was applied
    EngineSucceeded,
    /// Caller asked the engine to switch slots on next reboot
    SwitchSlot,
    /// Post-success cleanup finished
    Cleanup,
}

impl UpdateAction {
    pub const ALL: [Self; 10] = [
        Self::Apply,
        Self::Suspend,
        Self::Resume,
        Self::Cancel,
        Self::Reset,
        Self::EngineFailed,
        Self::EngineSlotReady,
        Self::EngineSucceeded,
        Self::SwitchSlot,
        Self::Cleanup,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::Reset => "reset",
            Self::EngineFailed => "engine-failed",
            Self::EngineSlotReady => "engine-slot-ready",
            Self::EngineSucceeded => "engine-succeeded",
            Self::SwitchSlot => "switch-slot",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up the target of `action` from `from`, if the table allows it
#[must_use]
pub fn next_state(from: UpdaterState, action: UpdateAction) -> Option<UpdaterState> {
    use UpdateAction as A;
    use UpdaterState as S;

    match (from, action) {
        (S::Idle, A::Apply) => Some(S::Running),

        (S::Running, A::Suspend) => Some(S::Paused),
        (S::Running, A::Cancel) => Some(S::Idle),
        (S::Running, A::EngineFailed) => Some(S::Error),
        (S::Running, A::EngineSlotReady) => Some(S::SlotSwitchRequired),
        (S::Running, A::EngineSucceeded) => Some(S::RebootRequired),

        (S::Paused, A::Resume) => Some(S::Running),
        (S::Paused, A::Reset) => Some(S::Idle),

        (S::Error, A::Reset) => Some(S::Idle),

        (S::SlotSwitchRequired, A::SwitchSlot | A::Reset) => Some(S::Idle),

        (S::RebootRequired, A::Cleanup) => Some(S::Idle),

        _ => None,
    }
}

/// Result of an applied transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: UpdaterState,
    pub to: UpdaterState,
    pub action: UpdateAction,
}

#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: UpdaterState,
}

impl StateMachine {
    /// New machine in [`UpdaterState::Idle`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> UpdaterState {
        self.state
    }

    /// Validate `action` against the current state without applying it
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the table has no edge for `action`.
    pub fn check(&self, action: UpdateAction) -> Result<UpdaterState, StateError> {
        next_state(self.state, action)
            .ok_or_else(|| StateError::invalid_transition(self.state, action))
    }

    /// Apply `action`, moving to the table's target state
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the table has no edge for `action`;
    /// the state is unchanged in that case.
    pub fn apply(&mut self, action: UpdateAction) -> Result<Transition, StateError> {
        let to = self.check(action)?;
        let from = std::mem::replace(&mut self.state, to);
        Ok(Transition { from, to, action })
    }

    /// Set IDLE from any state, bypassing the transition table.
    ///
    /// This is the single escape hatch of the machine. It exists for
    /// administrative overrides (cold-start reconciliation of a non-running
    /// record, clearing a record by hand) and skips every check `apply`
    /// makes. Callers are expected to log each use. Returns the state that
    /// was overridden.
    pub fn force_idle(&mut self) -> UpdaterState {
        std::mem::replace(&mut self.state, UpdaterState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        assert_eq!(StateMachine::new().state(), UpdaterState::Idle);
    }

    #[test]
    fn test_apply_then_success_path() {
        let mut machine = StateMachine::new();
        machine.apply(UpdateAction::Apply).unwrap();
        let t = machine.apply(UpdateAction::EngineSucceeded).unwrap();
        assert_eq!(t.from, UpdaterState::Running);
        assert_eq!(t.to, UpdaterState::RebootRequired);
        machine.apply(UpdateAction::Cleanup).unwrap();
        assert_eq!(machine.state(), UpdaterState::Idle);
    }

    #[test]
    fn test_reset_not_allowed_while_running() {
        let mut machine = StateMachine::new();
        machine.apply(UpdateAction::Apply).unwrap();
        let err = machine.apply(UpdateAction::Reset).unwrap_err();
        assert_eq!(err, StateError::invalid_transition("RUNNING", "reset"));
        assert_eq!(machine.state(), UpdaterState::Running);
    }

    #[test]
    fn test_check_does_not_mutate() {
        let mut machine = StateMachine::new();
        machine.apply(UpdateAction::Apply).unwrap();
        assert_eq!(machine.check(UpdateAction::Cancel), Ok(UpdaterState::Idle));
        assert_eq!(machine.state(), UpdaterState::Running);
    }

    #[test]
    fn test_force_idle_from_anywhere() {
        let mut machine = StateMachine::new();
        machine.apply(UpdateAction::Apply).unwrap();
        machine.apply(UpdateAction::EngineFailed).unwrap();
        assert_eq!(machine.force_idle(), UpdaterState::Error);
        assert_eq!(machine.state(), UpdaterState::Idle);
    }
}
