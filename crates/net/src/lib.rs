#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for ota
//!
//! Asks the update server which builds are published for the device and
//! downloads packages into the packages directory, resuming partial files.

mod check;
mod client;
mod download;

pub use check::{check_for_update, fetch_manifest, manifest_url};
pub use client::{NetClient, NetConfig};
pub use download::{Download, DownloadHandle, DownloadOutcome, DownloadStatus};

use ota_errors::{Error, NetworkError};
use url::Url;

/// File name for a package fetched from `url`: its last path segment
///
/// # Errors
///
/// Returns `InvalidUrl` if `url` does not parse or ends without a file name.
pub fn file_name_from_url(url: &str) -> Result<String, Error> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| NetworkError::InvalidUrl(format!("{url} has no file name")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://dl.example.com/alpha/aospa-alpha.zip?dl=1").unwrap(),
            "aospa-alpha.zip"
        );
        assert!(file_name_from_url("https://dl.example.com/").is_err());
    }
}
