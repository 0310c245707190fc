//! Record persistence tests

use std::sync::Arc;

use ota_state::{KeyValueStore, MemoryStore, SqliteStore, StatePersistence};
use ota_types::{EngineErrorCode, EngineStatus, PersistedUpdateRecord, UpdaterState};
use tempfile::tempdir;

fn running_record() -> PersistedUpdateRecord {
    PersistedUpdateRecord {
        update_state: UpdaterState::Running.record_text(),
        engine_state: EngineStatus::DOWNLOADING.record_text(),
        engine_error_state: PersistedUpdateRecord::UNKNOWN.to_string(),
        file_path: "/data/hub_updates/ota-alpha.zip".to_string(),
    }
}

#[tokio::test]
async fn test_empty_store_loads_defaults() {
    let persistence = StatePersistence::new(Arc::new(MemoryStore::new()));
    let record = persistence.load().await.unwrap();
    assert_eq!(record, PersistedUpdateRecord::default());
    assert_eq!(record.updater_state(), None);
}

#[tokio::test]
async fn test_memory_round_trip() {
    let persistence = StatePersistence::new(Arc::new(MemoryStore::new()));
    let record = running_record();
    persistence.save(&record).await.unwrap();
    assert_eq!(persistence.load().await.unwrap(), record);
}

#[tokio::test]
async fn test_read_failure_degrades_to_defaults() {
    let store = Arc::new(MemoryStore::new());
    let persistence = StatePersistence::new(store.clone());
    persistence.save(&running_record()).await.unwrap();

    store.set_fail_reads(true);
    assert!(persistence.load().await.is_err());
    assert_eq!(
        persistence.load_or_default().await,
        PersistedUpdateRecord::default()
    );
}

#[tokio::test]
async fn test_write_failure_leaves_previous_record() {
    let store = Arc::new(MemoryStore::new());
    let persistence = StatePersistence::new(store.clone());
    persistence.save(&running_record()).await.unwrap();

    store.set_fail_writes(true);
    let mut failed = running_record();
    failed.update_state = UpdaterState::Error.record_text();
    assert!(persistence.save(&failed).await.is_err());
    assert_eq!(
        store.snapshot(PersistedUpdateRecord::KEY_UPDATE_STATE).as_deref(),
        Some("RUNNING/2")
    );
}

#[tokio::test]
async fn test_sqlite_round_trip_survives_reopen() {
    let temp = tempdir().unwrap();
    let db_path = temp.path().join("ota").join("state.sqlite");

    let store = SqliteStore::open(&db_path).await.unwrap();
    let persistence = StatePersistence::new(Arc::new(store.clone()));
    let mut record = running_record();
    persistence.save(&record).await.unwrap();

    record.update_state = UpdaterState::Error.record_text();
    record.engine_error_state = EngineErrorCode::DOWNLOAD_TRANSFER_ERROR.record_text();
    persistence.save(&record).await.unwrap();
    store.close().await;

    let reopened = SqliteStore::open(&db_path).await.unwrap();
    let persistence = StatePersistence::new(Arc::new(reopened));
    let loaded = persistence.load().await.unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.updater_state(), Some(UpdaterState::Error));
}

#[tokio::test]
async fn test_sqlite_missing_key_is_none() {
    let temp = tempdir().unwrap();
    let store = SqliteStore::open(&temp.path().join("state.sqlite"))
        .await
        .unwrap();
    assert_eq!(store.get("update_state").await.unwrap(), None);
}
