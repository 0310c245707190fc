#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Update engine adapter
//!
//! The engine applies a payload in the background and reports back only
//! through callbacks. Control calls either succeed immediately or fail;
//! none of them wait for flashing work.

mod callback;
mod simulated;

pub use callback::{callback_channel, EngineCallback, EngineCallbackReceiver, EngineCallbackSender};
pub use simulated::{SimulatedEngine, SimulatedEngineConfig};

use ota_errors::EngineError;

/// Control surface of the platform update engine
pub trait UpdateEngine: Send + Sync {
    /// Start delivering callbacks to `callbacks`. Binding again replaces the
    /// previous receiver.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine service is unreachable.
    fn bind(&self, callbacks: EngineCallbackSender) -> Result<(), EngineError>;

    /// Stop delivering callbacks. Unbinding twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine service is unreachable.
    fn unbind(&self) -> Result<(), EngineError>;

    /// Submit a payload. The outcome arrives as callbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the submission.
    fn apply_payload(
        &self,
        locator: &str,
        offset: u64,
        size: u64,
        headers: &[String],
    ) -> Result<(), EngineError>;

    /// Ask the engine to abandon the running update. The engine acknowledges
    /// through callbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the request.
    fn cancel(&self) -> Result<(), EngineError>;

    /// Drop the engine's record of a finished or failed update.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the request.
    fn reset_status(&self) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// Returns an error if there is nothing to suspend.
    fn suspend(&self) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// Returns an error if there is nothing to resume.
    fn resume(&self) -> Result<(), EngineError>;

    /// Make the freshly written slot active on next boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the request.
    fn set_switch_slot_on_reboot(&self) -> Result<(), EngineError>;
}
