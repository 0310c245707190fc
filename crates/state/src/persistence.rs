//! Durable storage of the orchestrator recovery record

use std::sync::Arc;

use async_trait::async_trait;
use ota_errors::PersistenceError;
use ota_types::PersistedUpdateRecord;
use tracing::{debug, warn};

/// Minimal durable key/value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read one value
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Write every pair atomically; either all land or none do
    async fn put_all(&self, entries: &[(&str, &str)]) -> Result<(), PersistenceError>;
}

/// Maps [`PersistedUpdateRecord`] onto a [`KeyValueStore`]
#[derive(Clone)]
pub struct StatePersistence {
    store: Arc<dyn KeyValueStore>,
}

impl StatePersistence {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the record; keys that were never written take their defaults
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub async fn load(&self) -> Result<PersistedUpdateRecord, PersistenceError> {
        let mut record = PersistedUpdateRecord::default();
        if let Some(value) = self.store.get(PersistedUpdateRecord::KEY_UPDATE_STATE).await? {
            record.update_state = value;
        }
        if let Some(value) = self.store.get(PersistedUpdateRecord::KEY_ENGINE_STATE).await? {
            record.engine_state = value;
        }
        if let Some(value) = self
            .store
            .get(PersistedUpdateRecord::KEY_ENGINE_ERROR_STATE)
            .await?
        {
            record.engine_error_state = value;
        }
        if let Some(value) = self.store.get(PersistedUpdateRecord::KEY_FILE_PATH).await? {
            record.file_path = value;
        }
        debug!(update_state = %record.update_state, "loaded update record");
        Ok(record)
    }

    /// Read the record, falling back to defaults when the store fails
    pub async fn load_or_default(&self) -> PersistedUpdateRecord {
        match self.load().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "failed to read update record, using defaults");
                PersistedUpdateRecord::default()
            }
        }
    }

    /// Write all four fields
    ///
    /// # Errors
    ///
    /// Returns the store error; nothing is written in that case.
    pub async fn save(&self, record: &PersistedUpdateRecord) -> Result<(), PersistenceError> {
        self.store.put_all(&record.to_pairs()).await?;
        debug!(update_state = %record.update_state, file_path = %record.file_path, "saved update record");
        Ok(())
    }
}
