#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Updater state for ota
//!
//! This crate holds the pure updater state machine and the durable
//! record the orchestrator reconciles against on every cold start.

pub mod machine;
pub mod memory;
pub mod persistence;
pub mod sqlite;

pub use machine::{next_state, StateMachine, Transition, UpdateAction};
pub use memory::MemoryStore;
pub use persistence::{KeyValueStore, StatePersistence};
pub use sqlite::SqliteStore;
