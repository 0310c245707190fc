//! System setup and component wiring

use crate::error::CliError;
use ota_config::Config;
use ota_engine::SimulatedEngine;
use ota_events::EventSender;
use ota_net::NetClient;
use ota_orchestrator::UpdateOrchestrator;
use ota_platform::Platform;
use ota_state::{SqliteStore, StatePersistence};
use std::sync::Arc;
use tracing::{debug, info};

/// Opened components shared by every command
pub struct SystemSetup {
    config: Config,
    store: Option<Arc<SqliteStore>>,
}

impl SystemSetup {
    /// Create new system setup
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Open the state database
    pub async fn initialize(&mut self) -> Result<(), CliError> {
        let db_path = self.config.state_db_path();
        info!(path = %db_path.display(), "opening state database");
        let store = SqliteStore::open(&db_path).await?;
        self.store = Some(Arc::new(store));
        Ok(())
    }

    /// Record persistence over the opened database
    pub fn persistence(&self) -> Result<StatePersistence, CliError> {
        let store = self
            .store
            .clone()
            .ok_or_else(|| CliError::InvalidArguments("state database not opened".to_string()))?;
        Ok(StatePersistence::new(store))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        Platform::current(
            self.config.device.product.clone(),
            self.config.device.build_time,
            self.config.device.power_control,
        )
    }

    /// Product and build time of the running system
    pub async fn device_build(&self) -> Result<(String, i64), CliError> {
        let platform = self.platform();
        let product = platform.device().product().await?;
        let build_time = platform.device().build_time().await?;
        Ok((product, build_time))
    }

    /// HTTP client for the update server
    pub fn net_client(&self) -> Result<NetClient, CliError> {
        debug!(network = ?self.config.network, "creating update server client");
        Ok(NetClient::new((&self.config.network).into())?)
    }

    /// Orchestrator over the simulated engine, reporting on `event_sender`
    pub fn orchestrator(&self, event_sender: EventSender) -> Result<UpdateOrchestrator, CliError> {
        let engine = Arc::new(SimulatedEngine::new((&self.config.engine).into()));
        debug!(engine = ?self.config.engine, "using simulated update engine");

        let orchestrator = UpdateOrchestrator::builder()
            .with_engine(engine)
            .with_platform(self.platform())
            .with_persistence(self.persistence()?)
            .with_event_sender(event_sender)
            .with_config(&self.config)
            .build()?;
        Ok(orchestrator)
    }

    /// Close the state database
    pub async fn shutdown(&self) {
        if let Some(store) = &self.store {
            store.close().await;
        }
    }
}
