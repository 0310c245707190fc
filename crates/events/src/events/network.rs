use serde::{Deserialize, Serialize};

/// Update server and package download events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkEvent {
    /// Asking the update server for builds of a device
    CheckStarted { device: String, url: String },

    /// A build newer than the running one is published
    UpdateAvailable {
        id: String,
        version: String,
        datetime: i64,
        size: u64,
    },

    /// Nothing newer than the running build
    NoUpdateAvailable { device: String, published: usize },

    /// Download started, possibly from a partial file
    DownloadStarted {
        url: String,
        total_size: Option<u64>,
        resume_offset: u64,
    },

    /// Download progress update
    DownloadProgress {
        url: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// Download stopped; the partial file is kept for a later resume
    DownloadPaused { url: String, bytes_downloaded: u64 },

    /// Download finished and the file is complete
    DownloadCompleted {
        url: String,
        path: String,
        final_size: u64,
    },

    /// Download failed
    DownloadFailed {
        url: String,
        error: String,
        bytes_downloaded: u64,
    },

    /// Download abandoned and the partial file deleted
    DownloadCancelled { url: String },
}
