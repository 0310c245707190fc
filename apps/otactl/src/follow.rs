//! Following a running update to its end

use std::sync::Arc;

use ota_orchestrator::{UpdateListener, UpdateOrchestrator};
use ota_types::UpdaterState;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::error::CliError;

/// Listener that republishes state changes on a watch channel
struct StateWatch(watch::Sender<UpdaterState>);

impl UpdateListener for StateWatch {
    fn on_state_change(&self, state: UpdaterState) {
        self.0.send_replace(state);
    }
}

/// States in which the engine still owns the update
fn in_flight(state: UpdaterState) -> bool {
    matches!(state, UpdaterState::Running | UpdaterState::Paused)
}

/// Register a watcher before driving the orchestrator so no change is missed
pub async fn watch_states(orchestrator: &UpdateOrchestrator) -> watch::Receiver<UpdaterState> {
    let (tx, rx) = watch::channel(orchestrator.state().await);
    orchestrator.add_listener(Arc::new(StateWatch(tx))).await;
    rx
}

/// One message per Ctrl-C. Once this is called the process no longer
/// exits on SIGINT by itself.
pub fn interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Wait until the update leaves RUNNING/PAUSED.
///
/// The first interrupt asks the engine to cancel and keeps waiting for its
/// acknowledgement. A second interrupt gives up waiting and returns
/// [`CliError::Interrupted`]; the engine keeps whatever it is doing.
pub async fn follow_update(
    orchestrator: &UpdateOrchestrator,
    mut states: watch::Receiver<UpdaterState>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> Result<UpdaterState, CliError> {
    let mut cancel_requested = false;
    loop {
        let current = *states.borrow_and_update();
        if !in_flight(current) {
            return Ok(current);
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    return Ok(orchestrator.state().await);
                }
            }
            Some(()) = interrupts.recv() => {
                if cancel_requested {
                    warn!(state = %current, "second interrupt, no longer waiting for the engine");
                    return Err(CliError::Interrupted(format!(
                        "left the update {current}; run `otactl recover` to follow it"
                    )));
                }
                cancel_requested = true;
                info!("interrupt received, cancelling update");
                if let Err(e) = orchestrator.cancel_running_update().await {
                    warn!(error = %e, "cancel refused");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::SystemSetup;
    use ota_config::Config;
    use ota_types::UpdateConfig;
    use std::io::{Cursor, Write};
    use std::path::{Path, PathBuf};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn write_package(dir: &Path) -> PathBuf {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer
            .start_file("META-INF/com/android/metadata", stored)
            .unwrap();
        writer.write_all(b"ota-type=AB\npre-device=alpha\n").unwrap();
        writer.start_file("payload_properties.txt", stored).unwrap();
        writer.write_all(b"FILE_HASH=abc\n").unwrap();
        writer.start_file("payload.bin", stored).unwrap();
        writer.write_all(&[7u8; 256]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let path = dir.join("ota.zip");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Engine that sleeps a minute between chunks, so a cancel is never
    /// acknowledged while the test runs
    fn slow_engine_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.device.product = Some("alpha".to_string());
        config.paths.state_db = Some(dir.join("state.sqlite"));
        config.engine.simulated_chunk_bytes = 64;
        config.engine.simulated_step_ms = 60_000;
        config
    }

    #[tokio::test]
    async fn test_second_interrupt_stops_waiting() {
        let temp = tempfile::tempdir().unwrap();
        let package = write_package(temp.path());
        let mut setup = SystemSetup::new(slow_engine_config(temp.path()));
        setup.initialize().await.unwrap();

        let (tx, _rx) = ota_events::channel();
        let orchestrator = setup.orchestrator(tx).unwrap();
        orchestrator.reconcile_on_start().await.unwrap();
        orchestrator.bind().await.unwrap();
        let states = watch_states(&orchestrator).await;
        orchestrator
            .apply_update(&UpdateConfig::from_package_path(package))
            .await
            .unwrap();

        let (interrupt, mut interrupts) = mpsc::unbounded_channel();
        interrupt.send(()).unwrap();
        interrupt.send(()).unwrap();

        let result = follow_update(&orchestrator, states, &mut interrupts).await;
        assert!(matches!(result, Err(CliError::Interrupted(_))));
        assert_eq!(orchestrator.state().await, UpdaterState::Running);
        setup.shutdown().await;
    }

    #[tokio::test]
    async fn test_returns_once_update_leaves_flight() {
        let (tx, states) = watch::channel(UpdaterState::Idle);
        let temp = tempfile::tempdir().unwrap();
        let mut setup = SystemSetup::new(slow_engine_config(temp.path()));
        setup.initialize().await.unwrap();
        let (events, _rx) = ota_events::channel();
        let orchestrator = setup.orchestrator(events).unwrap();

        let (_interrupt, mut interrupts) = mpsc::unbounded_channel();
        let state = follow_update(&orchestrator, states, &mut interrupts)
            .await
            .unwrap();
        assert_eq!(state, UpdaterState::Idle);
        drop(tx);
        setup.shutdown().await;
    }
}
