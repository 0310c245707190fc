//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use ota_errors::{Error, NetworkError};
    use ota_events::{channel, AppEvent, EventReceiver, NetworkEvent};
    use ota_net::*;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"{
        "updates": [
            {
                "date": "2024-05-01",
                "datetime": 1714521600,
                "filename": "aospa-alpha-1.zip",
                "url": "https://dl.example.com/aospa-alpha-1.zip",
                "recovery_sha256": "00",
                "fastboot": "aospa-alpha-1-img.zip",
                "fastboot_sha256": "00",
                "id": "one",
                "size": 2048,
                "build_type": "release",
                "version_code": "1",
                "version": "uvite",
                "android_version": "14",
                "android_spl": "2024-05-01",
                "changelog_device": ""
            },
            {
                "date": "2024-06-01",
                "datetime": 1717200000,
                "filename": "aospa-alpha-2.zip",
                "url": "https://dl.example.com/aospa-alpha-2.zip",
                "id": "two",
                "size": 4096,
                "version": "uvite"
            }
        ]
    }"#;

    fn create_test_data(size: usize) -> Vec<u8> {
        #[allow(clippy::cast_possible_truncation)]
        (0..size).map(|i| (i % 251) as u8).collect()
    }

    fn client() -> NetClient {
        NetClient::new(NetConfig {
            retry_count: 0,
            ..NetConfig::default()
        })
        .unwrap()
    }

    fn network_events(rx: &mut EventReceiver) -> Vec<NetworkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Network(event) = event {
                events.push(event);
            }
        }
        events
    }

    #[tokio::test]
    async fn test_check_picks_newest_build_after_running_one() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/updates/alpha");
            then.status(200).body(MANIFEST);
        });

        let base = server.url("/updates");
        let update = check_for_update(&client(), &base, "alpha", 1_714_521_600, &tx)
            .await
            .unwrap()
            .unwrap();

        mock.assert();
        assert_eq!(update.id, "two");
        assert_eq!(update.filename, "aospa-alpha-2.zip");
        assert_eq!(update.size, 4096);

        let events = network_events(&mut rx);
        assert!(matches!(events[0], NetworkEvent::CheckStarted { .. }));
        assert!(matches!(
            &events[1],
            NetworkEvent::UpdateAvailable { id, .. } if id == "two"
        ));
    }

    #[tokio::test]
    async fn test_check_up_to_date() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/updates/alpha");
            then.status(200).body(MANIFEST);
        });

        let base = server.url("/updates");
        let update = check_for_update(&client(), &base, "alpha", 1_717_200_000, &tx)
            .await
            .unwrap();

        assert!(update.is_none());
        assert!(network_events(&mut rx)
            .iter()
            .any(|e| matches!(e, NetworkEvent::NoUpdateAvailable { published: 2, .. })));
    }

    #[tokio::test]
    async fn test_check_unknown_device() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/updates/gamma");
            then.status(404);
        });

        let result = fetch_manifest(&client(), &server.url("/updates"), "gamma", &tx).await;
        assert!(matches!(
            result,
            Err(Error::Network(NetworkError::HttpError { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn test_check_rejects_non_manifest_body() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/updates/alpha");
            then.status(200).body("<html>moved</html>");
        });

        let result = fetch_manifest(&client(), &server.url("/updates"), "alpha", &tx).await;
        assert!(matches!(
            result,
            Err(Error::Network(NetworkError::InvalidManifest { .. }))
        ));
    }

    #[tokio::test]
    async fn test_download_file() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        let content = create_test_data(64 * 1024);
        let mock = server.mock(|when, then| {
            when.method(GET).path("/ota.zip").header_missing("range");
            then.status(200)
                .header("content-length", content.len().to_string())
                .body(&content);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("packages").join("ota.zip");
        let download = Download::new(&server.url("/ota.zip"), &dest)
            .unwrap()
            .with_expected_size(content.len() as u64);
        let partial = download.partial_path();

        let outcome = download.start(client(), tx).finish().await.unwrap();

        mock.assert();
        assert_eq!(
            outcome,
            DownloadOutcome::Completed {
                path: dest.clone(),
                size: content.len() as u64,
            }
        );
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
        assert!(!partial.exists());

        let events = network_events(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            NetworkEvent::DownloadStarted { resume_offset: 0, total_size: Some(65536), .. }
        )));
        assert!(matches!(
            events.last(),
            Some(NetworkEvent::DownloadCompleted { final_size: 65536, .. })
        ));
    }

    #[tokio::test]
    async fn test_download_resumes_partial_file() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        let content = create_test_data(10_000);
        let (first, rest) = content.split_at(4_000);
        let mock = server.mock(|when, then| {
            when.method(GET).path("/ota.zip").header("range", "bytes=4000-");
            then.status(206)
                .header("content-length", rest.len().to_string())
                .header("content-range", format!("bytes 4000-9999/{}", content.len()))
                .body(rest);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("ota.zip");
        let download = Download::new(&server.url("/ota.zip"), &dest).unwrap();
        std::fs::write(download.partial_path(), first).unwrap();

        let outcome = download.start(client(), tx).finish().await.unwrap();

        mock.assert();
        assert!(matches!(outcome, DownloadOutcome::Completed { size: 10_000, .. }));
        assert_eq!(std::fs::read(&dest).unwrap(), content);
        assert!(network_events(&mut rx).iter().any(|e| matches!(
            e,
            NetworkEvent::DownloadStarted {
                resume_offset: 4000,
                total_size: Some(10_000),
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_server_without_range_support_restarts() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        let content = create_test_data(5_000);
        server.mock(|when, then| {
            when.method(GET).path("/ota.zip");
            then.status(200).body(&content);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("ota.zip");
        let download = Download::new(&server.url("/ota.zip"), &dest).unwrap();
        std::fs::write(download.partial_path(), b"stale bytes from another build").unwrap();

        let outcome = download.start(client(), tx).finish().await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::Completed { size: 5_000, .. }));
        assert_eq!(std::fs::read(&dest).unwrap(), content);
    }

    #[tokio::test]
    async fn test_size_mismatch_discards_file() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/ota.zip");
            then.status(200).body(create_test_data(100));
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("ota.zip");
        let download = Download::new(&server.url("/ota.zip"), &dest)
            .unwrap()
            .with_expected_size(4096);
        let partial = download.partial_path();

        let result = download.start(client(), tx).finish().await;
        assert!(matches!(
            result,
            Err(Error::Network(NetworkError::DownloadFailed(_)))
        ));
        assert!(!dest.exists());
        assert!(!partial.exists());
        assert!(network_events(&mut rx)
            .iter()
            .any(|e| matches!(e, NetworkEvent::DownloadFailed { .. })));
    }

    #[tokio::test]
    async fn test_http_error_keeps_partial_file() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/ota.zip");
            then.status(503);
        });

        let temp = tempdir().unwrap();
        let download =
            Download::new(&server.url("/ota.zip"), temp.path().join("ota.zip")).unwrap();
        std::fs::write(download.partial_path(), b"12345").unwrap();
        let partial = download.partial_path();

        let result = download.start(client(), tx).finish().await;
        assert!(matches!(
            result,
            Err(Error::Network(NetworkError::HttpError { status: 503, .. }))
        ));
        assert_eq!(std::fs::read(&partial).unwrap(), b"12345");
    }

    #[tokio::test]
    async fn test_pause_then_finish_keeps_partial_file() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/slow.zip");
            then.status(206)
                .delay(Duration::from_secs(5))
                .body(create_test_data(10));
        });

        let temp = tempdir().unwrap();
        let download =
            Download::new(&server.url("/slow.zip"), temp.path().join("slow.zip")).unwrap();
        std::fs::write(download.partial_path(), b"0123456789").unwrap();
        let partial = download.partial_path();

        let handle = download.start(client(), tx);
        handle.pause();
        let outcome = handle.finish().await.unwrap();

        assert_eq!(outcome, DownloadOutcome::Paused { bytes_downloaded: 10 });
        assert_eq!(std::fs::read(&partial).unwrap(), b"0123456789");
        assert!(network_events(&mut rx)
            .iter()
            .any(|e| matches!(e, NetworkEvent::DownloadPaused { bytes_downloaded: 10, .. })));
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        let content = create_test_data(2_000);
        server.mock(|when, then| {
            when.method(GET).path("/ota.zip");
            then.status(200)
                .delay(Duration::from_millis(300))
                .body(&content);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("ota.zip");
        let download = Download::new(&server.url("/ota.zip"), &dest).unwrap();

        let mut handle = download.start(client(), tx);
        handle.pause();
        let mut status = handle.status();
        status
            .wait_for(|s| matches!(s, DownloadStatus::Paused { .. }))
            .await
            .unwrap();

        handle.resume();
        let outcome = handle.wait().await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::Completed { size: 2_000, .. }));
        assert_eq!(std::fs::read(&dest).unwrap(), content);
    }

    #[tokio::test]
    async fn test_cancel_deletes_partial_file() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/slow.zip");
            then.status(200)
                .delay(Duration::from_secs(5))
                .body(create_test_data(10));
        });

        let temp = tempdir().unwrap();
        let download =
            Download::new(&server.url("/slow.zip"), temp.path().join("slow.zip")).unwrap();
        std::fs::write(download.partial_path(), b"partial").unwrap();
        let partial = download.partial_path();

        let mut handle = download.start(client(), tx);
        handle.cancel();
        let outcome = handle.wait().await.unwrap();

        assert_eq!(outcome, DownloadOutcome::Cancelled);
        assert!(!partial.exists());
        assert!(network_events(&mut rx)
            .iter()
            .any(|e| matches!(e, NetworkEvent::DownloadCancelled { .. })));
    }
}
