use serde::{Deserialize, Serialize};

use crate::EventSource;

// Declare all domain modules
pub mod engine;
pub mod general;
pub mod network;
pub mod package;
pub mod updater;

// Re-export all domain events
pub use engine::*;
pub use general::*;
pub use network::*;
pub use package::*;
pub use updater::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Orchestrator state machine events
    Updater(UpdaterEvent),

    /// Update engine relay events
    Engine(EngineEvent),

    /// Package inspection events
    Package(PackageEvent),

    /// Update check and package download events
    Network(NetworkEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Updater(_) => EventSource::UPDATER,
            Self::Engine(_) => EventSource::ENGINE,
            Self::Package(_) => EventSource::PACKAGE,
            Self::Network(_) => EventSource::NETWORK,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Package(PackageEvent::ValidationFailed { .. })
            | Self::Engine(EngineEvent::CallFailed { .. })
            | Self::Updater(UpdaterEvent::RecordWriteFailed { .. })
            | Self::Network(NetworkEvent::DownloadFailed { .. }) => Level::ERROR,

            Self::Engine(EngineEvent::PayloadApplicationComplete { error_code })
                if !error_code.is_success() =>
            {
                Level::ERROR
            }

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Updater(
                UpdaterEvent::TransitionRejected { .. }
                | UpdaterEvent::ForcedIdle { .. }
                | UpdaterEvent::RecordReadFailed { .. },
            )
            | Self::Network(
                NetworkEvent::DownloadPaused { .. } | NetworkEvent::DownloadCancelled { .. },
            ) => Level::WARN,

            // Debug-level events (progress updates, internal state)
            Self::Engine(EngineEvent::Progress { .. })
            | Self::Network(
                NetworkEvent::CheckStarted { .. } | NetworkEvent::DownloadProgress { .. },
            )
            | Self::Package(PackageEvent::InspectionStarted { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "ota::events::general",
            Self::Updater(_) => "ota::events::updater",
            Self::Engine(_) => "ota::events::engine",
            Self::Package(_) => "ota::events::package",
            Self::Network(_) => "ota::events::network",
        }
    }
}
