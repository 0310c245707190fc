//! Orchestrator assembly

use std::path::PathBuf;
use std::sync::Arc;

use ota_config::Config;
use ota_engine::UpdateEngine;
use ota_errors::{ConfigError, Error};
use ota_events::EventSender;
use ota_platform::Platform;
use ota_state::StatePersistence;

use crate::orchestrator::UpdateOrchestrator;

/// Builder for [`UpdateOrchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    engine: Option<Arc<dyn UpdateEngine>>,
    platform: Option<Platform>,
    persistence: Option<StatePersistence>,
    tx: Option<EventSender>,
    payload_root: Option<PathBuf>,
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn UpdateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: StatePersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Directory under which the engine sees packages
    #[must_use]
    pub fn with_payload_root(mut self, root: Option<PathBuf>) -> Self {
        self.payload_root = root;
        self
    }

    /// Take the settings that apply from configuration
    #[must_use]
    pub fn with_config(self, config: &Config) -> Self {
        self.with_payload_root(config.engine.payload_root.clone())
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the engine, platform or persistence is missing.
    pub fn build(self) -> Result<UpdateOrchestrator, Error> {
        let engine = self.engine.ok_or_else(|| ConfigError::MissingField {
            field: "engine".to_string(),
        })?;
        let platform = self.platform.ok_or_else(|| ConfigError::MissingField {
            field: "platform".to_string(),
        })?;
        let persistence = self.persistence.ok_or_else(|| ConfigError::MissingField {
            field: "persistence".to_string(),
        })?;

        Ok(UpdateOrchestrator::new(
            engine,
            platform,
            persistence,
            self.tx,
            self.payload_root,
        ))
    }
}
