#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Update orchestrator
//!
//! Sequences one package at a time through the update engine. Control
//! calls and engine callbacks are serialized behind a single lock; every
//! state change goes through the transition table, is persisted before the
//! triggering call returns, and is republished to listeners and the event
//! channel. On cold start the persisted record is reconciled before the
//! engine is bound.

mod builder;
mod listener;
mod orchestrator;

pub use builder::OrchestratorBuilder;
pub use listener::UpdateListener;
pub use orchestrator::UpdateOrchestrator;
