//! In-memory key/value store for tests and hosts without durable storage

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ota_errors::PersistenceError;

use crate::persistence::KeyValueStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current value of `key`, bypassing failure injection
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::ReadFailed {
                key: key.to_string(),
                message: "injected read failure".to_string(),
            });
        }
        let values = self.values.lock().map_err(|_| PersistenceError::ReadFailed {
            key: key.to_string(),
            message: "store lock poisoned".to_string(),
        })?;
        Ok(values.get(key).cloned())
    }

    async fn put_all(&self, entries: &[(&str, &str)]) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteFailed {
                message: "injected write failure".to_string(),
            });
        }
        let mut values = self.values.lock().map_err(|_| PersistenceError::WriteFailed {
            message: "store lock poisoned".to_string(),
        })?;
        for (key, value) in entries {
            values.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }
}
