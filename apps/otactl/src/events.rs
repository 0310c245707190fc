//! Event handling and progress display

use console::{Style, Term};
use ota_events::{
    AppEvent, EngineEvent, GeneralEvent, NetworkEvent, PackageEvent, UpdaterEvent,
};
use ota_types::UpdaterState;

use crate::logging::log_event_with_tracing;

/// Progress is reported in steps of this many percent
const PROGRESS_STEP: u32 = 10;

/// Event handler for progress display and user feedback
pub struct EventHandler {
    /// Terminal for status lines
    term: Term,
    /// Whether colors are enabled
    colors_enabled: bool,
    /// Print status lines at all (off in JSON mode)
    show: bool,
    /// Debug mode shows every engine status and relay
    debug_enabled: bool,
    /// Last progress step printed
    last_progress: Option<u32>,
    /// Last download progress step printed
    last_download_progress: Option<u32>,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, show: bool, debug_enabled: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            show,
            debug_enabled,
            last_progress: None,
            last_download_progress: None,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);
        if !self.show {
            return;
        }

        match event {
            AppEvent::Updater(event) => self.handle_updater_event(event),
            AppEvent::Engine(event) => self.handle_engine_event(event),
            AppEvent::Package(event) => self.handle_package_event(event),
            AppEvent::General(event) => self.handle_general_event(event),
            AppEvent::Network(event) => self.handle_network_event(event),
        }
    }

    fn handle_updater_event(&mut self, event: UpdaterEvent) {
        match event {
            UpdaterEvent::StateChanged { from, to, .. } => {
                if to == UpdaterState::Running {
                    self.last_progress = None;
                }
                let line = format!("{from} -> {}", self.style_state(to));
                self.show_status(&line);
            }
            UpdaterEvent::TransitionRejected { from, action } => {
                self.show_warning(&format!("cannot {action} while {from}"));
            }
            UpdaterEvent::ForcedIdle { from, reason } => {
                self.show_warning(&format!("{from} forced to IDLE ({reason})"));
            }
            UpdaterEvent::Reconciled { persisted, state } => {
                if self.debug_enabled {
                    self.show_status(&format!("restored {state} from {persisted}"));
                }
            }
            UpdaterEvent::CancelRequested => {
                self.show_status("cancel requested, waiting for the engine");
            }
            UpdaterEvent::CleanupCompleted { file_path, deleted } => {
                if deleted {
                    self.show_status(&format!("removed {file_path}"));
                }
                self.show_success("update applied; reboot to finish");
            }
            UpdaterEvent::RecordWriteFailed { error } => {
                self.show_warning(&format!("update record not saved: {error}"));
            }
            UpdaterEvent::RecordReadFailed { error } => {
                self.show_warning(&format!("update record unreadable: {error}"));
            }
            UpdaterEvent::RebootRequested => {
                self.show_status("rebooting");
            }
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PayloadSubmitted { size, .. } => {
                self.show_status(&format!("payload submitted ({size} bytes)"));
            }
            EngineEvent::StatusChanged { status } => {
                if self.debug_enabled {
                    self.show_status(&format!("engine {status}"));
                }
            }
            EngineEvent::Progress { fraction } => self.handle_progress(fraction),
            EngineEvent::PayloadApplicationComplete { error_code } => {
                if !error_code.is_success() {
                    self.show_error(&format!("engine finished with {error_code}"));
                }
            }
            EngineEvent::CallFailed { operation, error } => {
                self.show_error(&format!("engine {operation} failed: {error}"));
            }
            EngineEvent::Bound | EngineEvent::Unbound => {}
        }
    }

    fn handle_package_event(&mut self, event: PackageEvent) {
        match event {
            PackageEvent::Inspected { path, size, .. } => {
                self.show_status(&format!("{path}: payload {size} bytes"));
            }
            PackageEvent::ValidationFailed { path, detail, .. } => {
                self.show_error(&format!("{path} rejected: {detail}"));
            }
            PackageEvent::InspectionStarted { .. } => {}
        }
    }

    fn handle_general_event(&mut self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(context) => self.show_warning(&format!("{message} ({context})")),
                None => self.show_warning(&message),
            },
            GeneralEvent::Error { message, details } => match details {
                Some(details) => self.show_error(&format!("{message}: {details}")),
                None => self.show_error(&message),
            },
            // The final error is printed by main.
            GeneralEvent::OperationStarted { .. }
            | GeneralEvent::OperationCompleted { .. }
            | GeneralEvent::OperationFailed { .. } => {}
        }
    }

    fn handle_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::CheckStarted { device, .. } => {
                self.show_status(&format!("checking for updates for {device}"));
            }
            NetworkEvent::UpdateAvailable { version, id, .. } => {
                self.show_success(&format!("update available: {version} ({id})"));
            }
            NetworkEvent::NoUpdateAvailable { .. } => {}
            NetworkEvent::DownloadStarted {
                url,
                resume_offset,
                ..
            } => {
                self.last_download_progress = None;
                if resume_offset > 0 {
                    self.show_status(&format!("resuming {url} at {resume_offset} bytes"));
                } else {
                    self.show_status(&format!("downloading {url}"));
                }
            }
            NetworkEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => self.handle_download_progress(bytes_downloaded, total_bytes),
            NetworkEvent::DownloadPaused {
                bytes_downloaded, ..
            } => {
                self.show_warning(&format!("download paused at {bytes_downloaded} bytes"));
            }
            NetworkEvent::DownloadCompleted { path, .. } => {
                self.show_success(&format!("saved {path}"));
            }
            NetworkEvent::DownloadFailed { error, .. } => {
                self.show_error(&format!("download failed: {error}"));
            }
            NetworkEvent::DownloadCancelled { .. } => {
                self.show_warning("download cancelled");
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn handle_download_progress(&mut self, bytes_downloaded: u64, total_bytes: Option<u64>) {
        let Some(total) = total_bytes.filter(|&total| total > 0) else {
            return;
        };
        let percent = (bytes_downloaded.min(total) * 100 / total) as u32;
        let step = percent / PROGRESS_STEP * PROGRESS_STEP;
        if self.last_download_progress.is_some_and(|last| last >= step) {
            return;
        }
        self.last_download_progress = Some(step);
        self.show_status(&format!("{step:>3}% of {total} bytes"));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn handle_progress(&mut self, fraction: f32) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0) as u32;
        let step = percent / PROGRESS_STEP * PROGRESS_STEP;
        if self.last_progress.is_some_and(|last| last >= step) {
            return;
        }
        self.last_progress = Some(step);
        self.show_status(&format!("{step:>3}%"));
    }

    fn style_state(&self, state: UpdaterState) -> String {
        let style = match state {
            UpdaterState::Error => Style::new().red().bold(),
            UpdaterState::Running | UpdaterState::Paused => Style::new().cyan(),
            UpdaterState::SlotSwitchRequired | UpdaterState::RebootRequired => {
                Style::new().yellow()
            }
            UpdaterState::Idle => Style::new().green(),
        };
        self.paint(&style, state.as_str())
    }

    fn paint(&self, style: &Style, text: &str) -> String {
        if self.colors_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn show_status(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn show_success(&self, message: &str) {
        let line = self.paint(&Style::new().green(), message);
        let _ = self.term.write_line(&line);
    }

    fn show_warning(&self, message: &str) {
        let line = self.paint(&Style::new().yellow(), &format!("warning: {message}"));
        let _ = self.term.write_line(&line);
    }

    fn show_error(&self, message: &str) {
        let line = self.paint(&Style::new().red(), &format!("error: {message}"));
        let _ = self.term.write_line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_only_advances_in_steps() {
        let mut handler = EventHandler::new(false, false, false);
        handler.handle_progress(0.05);
        assert_eq!(handler.last_progress, Some(0));
        handler.handle_progress(0.09);
        assert_eq!(handler.last_progress, Some(0));
        handler.handle_progress(0.42);
        assert_eq!(handler.last_progress, Some(40));
        handler.handle_progress(0.3);
        assert_eq!(handler.last_progress, Some(40));
        handler.handle_progress(1.5);
        assert_eq!(handler.last_progress, Some(100));
    }

    #[test]
    fn test_download_progress_needs_a_total() {
        let mut handler = EventHandler::new(false, false, false);
        handler.handle_download_progress(500, None);
        assert_eq!(handler.last_download_progress, None);
        handler.handle_download_progress(250, Some(1000));
        assert_eq!(handler.last_download_progress, Some(20));
        handler.handle_download_progress(5000, Some(1000));
        assert_eq!(handler.last_download_progress, Some(100));
    }

    #[test]
    fn test_plain_paint_without_colors() {
        let handler = EventHandler::new(false, true, false);
        assert_eq!(handler.style_state(UpdaterState::Error), "ERROR");
    }
}
