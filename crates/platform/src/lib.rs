#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Device platform primitives for the ota orchestrator.
//!
//! The orchestrator needs three things from the device it runs on: the
//! product identifier packages are matched against, a wake lock held while
//! an update is in flight, and a reboot. Each sits behind a trait so hosts
//! without these primitives (and tests) can substitute their own.

pub mod core;
pub mod device;
pub mod power;
pub mod process;

pub use core::Platform;
pub use device::{
    DeviceIdentity, PropertyDevice, StaticDevice, BUILD_DATE_PROPERTY, PRODUCT_DEVICE_PROPERTY,
};
pub use power::{NoopPower, PowerControl, SysfsPower};
pub use process::{CommandOutput, PlatformCommand, ProcessOperations, SystemProcess};
