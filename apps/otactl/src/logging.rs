//! Structured logging integration for events
//!
//! Converts orchestrator events into tracing records with structured fields,
//! so a `--debug` log file carries the same information the terminal shows.

use ota_events::{
    AppEvent, EngineEvent, GeneralEvent, NetworkEvent, PackageEvent, UpdaterEvent,
};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let source = event.event_source();
    let source = source.as_str();

    match event {
        AppEvent::Updater(updater_event) => match updater_event {
            UpdaterEvent::StateChanged { from, to, action } => {
                info!(source, from = %from, to = %to, action = %action, "Updater state changed");
            }
            UpdaterEvent::TransitionRejected { from, action } => {
                warn!(source, from = %from, action = %action, "Transition rejected");
            }
            UpdaterEvent::ForcedIdle { from, reason } => {
                warn!(source, from = %from, reason = %reason, "Updater forced to IDLE");
            }
            UpdaterEvent::Reconciled { persisted, state } => {
                info!(source, persisted = %persisted, state = %state, "Updater state reconciled");
            }
            UpdaterEvent::CancelRequested => {
                info!(source, "Cancel requested");
            }
            UpdaterEvent::CleanupCompleted { file_path, deleted } => {
                info!(source, file_path = %file_path, deleted, "Post-update cleanup completed");
            }
            UpdaterEvent::RecordWriteFailed { error } => {
                error!(source, error = %error, "Failed to persist update record");
            }
            UpdaterEvent::RecordReadFailed { error } => {
                warn!(source, error = %error, "Failed to read update record");
            }
            UpdaterEvent::RebootRequested => {
                info!(source, "Reboot requested");
            }
        },

        AppEvent::Engine(engine_event) => match engine_event {
            EngineEvent::Bound => debug!(source, "Engine bound"),
            EngineEvent::Unbound => debug!(source, "Engine unbound"),
            EngineEvent::PayloadSubmitted {
                locator,
                offset,
                size,
                header_count,
            } => {
                info!(
                    source,
                    locator = %locator,
                    offset,
                    size,
                    header_count,
                    "Payload submitted"
                );
            }
            EngineEvent::StatusChanged { status } => {
                info!(source, status = %status, code = status.code(), "Engine status");
            }
            EngineEvent::Progress { fraction } => {
                debug!(source, fraction, "Engine progress");
            }
            EngineEvent::PayloadApplicationComplete { error_code } => {
                if error_code.is_success() {
                    info!(source, code = %error_code, "Payload application complete");
                } else {
                    error!(
                        source,
                        code = %error_code,
                        value = error_code.code(),
                        "Payload application failed"
                    );
                }
            }
            EngineEvent::CallFailed { operation, error } => {
                error!(source, operation = %operation, error = %error, "Engine call failed");
            }
        },

        AppEvent::Package(package_event) => match package_event {
            PackageEvent::InspectionStarted { path } => {
                debug!(source, path = %path, "Inspecting package");
            }
            PackageEvent::Inspected {
                path,
                offset,
                size,
                header_count,
            } => {
                info!(source, path = %path, offset, size, header_count, "Package inspected");
            }
            PackageEvent::ValidationFailed {
                path,
                reason,
                detail,
            } => {
                error!(source, path = %path, reason = %reason, detail = %detail, "Package rejected");
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(source, context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(source, details = ?details, "{message}");
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(source, operation = %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                info!(source, operation = %operation, success, "Operation completed");
            }
            GeneralEvent::OperationFailed { operation, error } => {
                error!(source, operation = %operation, error = %error, "Operation failed");
            }
        },

        AppEvent::Network(network_event) => match network_event {
            NetworkEvent::CheckStarted { device, url } => {
                debug!(source, device = %device, url = %url, "Checking for updates");
            }
            NetworkEvent::UpdateAvailable {
                id,
                version,
                datetime,
                size,
            } => {
                info!(source, id = %id, version = %version, datetime, size, "Update available");
            }
            NetworkEvent::NoUpdateAvailable { device, published } => {
                info!(source, device = %device, published, "No update available");
            }
            NetworkEvent::DownloadStarted {
                url,
                total_size,
                resume_offset,
            } => {
                info!(source, url = %url, total_size = ?total_size, resume_offset, "Download started");
            }
            NetworkEvent::DownloadProgress {
                url,
                bytes_downloaded,
                total_bytes,
            } => {
                debug!(
                    source,
                    url = %url,
                    bytes_downloaded,
                    total_bytes = ?total_bytes,
                    "Download progress"
                );
            }
            NetworkEvent::DownloadPaused {
                url,
                bytes_downloaded,
            } => {
                warn!(source, url = %url, bytes_downloaded, "Download paused");
            }
            NetworkEvent::DownloadCompleted {
                url,
                path,
                final_size,
            } => {
                info!(source, url = %url, path = %path, final_size, "Download completed");
            }
            NetworkEvent::DownloadFailed {
                url,
                error,
                bytes_downloaded,
            } => {
                error!(source, url = %url, error = %error, bytes_downloaded, "Download failed");
            }
            NetworkEvent::DownloadCancelled { url } => {
                warn!(source, url = %url, "Download cancelled");
            }
        },
    }
}
