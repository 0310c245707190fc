//! Integration tests for events

#[cfg(test)]
mod tests {
    use ota_events::*;
    use ota_types::{EngineErrorCode, UpdaterState};

    #[tokio::test]
    async fn test_event_emitter_on_sender() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_state_changed(UpdaterState::Idle, UpdaterState::Running, "apply");

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(
            event1,
            AppEvent::General(GeneralEvent::Error { .. })
        ));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::Updater(UpdaterEvent::StateChanged {
                from: UpdaterState::Idle,
                to: UpdaterState::Running,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_failed_completion_logs_at_error() {
        let failed = AppEvent::Engine(EngineEvent::PayloadApplicationComplete {
            error_code: EngineErrorCode::NOT_ENOUGH_SPACE,
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);

        let ok = AppEvent::Engine(EngineEvent::PayloadApplicationComplete {
            error_code: EngineErrorCode::SUCCESS,
        });
        assert_eq!(ok.log_level(), tracing::Level::INFO);
        assert_eq!(ok.log_target(), "ota::events::engine");
        assert_eq!(ok.event_source().as_str(), "engine");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Updater(UpdaterEvent::TransitionRejected {
            from: UpdaterState::Idle,
            action: "cancel".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "updater");
        assert_eq!(json["event"]["type"], "TransitionRejected");
        assert_eq!(json["event"]["from"], "IDLE");
    }

    #[tokio::test]
    async fn test_download_progress_is_network_debug() {
        let (tx, mut rx) = channel();
        tx.emit_download_progress("http://host/ota.zip", 512, Some(1024));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.log_level(), tracing::Level::DEBUG);
        assert_eq!(event.log_target(), "ota::events::network");
        assert_eq!(event.event_source().as_str(), "network");

        let failed = AppEvent::Network(NetworkEvent::DownloadFailed {
            url: "http://host/ota.zip".into(),
            error: "reset".into(),
            bytes_downloaded: 512,
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);
    }
}
